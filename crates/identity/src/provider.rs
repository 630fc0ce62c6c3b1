//! Identity provider trait and the local, password-based implementation.

use crate::password::{hash_password, verify_password};
use crate::session::{SessionTable, SessionToken};
use crate::{Error, Result};
use chrono::{Duration, Utc};
use policy::Role;
use serde::Deserialize;
use storage::{NewUser, SharedStore, User};
use tracing::{debug, info};

/// Username and password as submitted at login.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Fields submitted at sign-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub full_name: String,
}

/// Authenticates users and resolves the identity behind a session token.
///
/// Implementations must return the account as stored at call time; the
/// access gate relies on that to see block toggles immediately.
pub trait IdentityProvider: Send + Sync {
    /// Create a standard account with a trial subscription.
    fn register(&self, registration: &Registration) -> Result<User>;

    /// Verify credentials. Fails with [`Error::InvalidCredentials`].
    fn authenticate(&self, credentials: &Credentials) -> Result<User>;

    fn issue_session(&self, user: &User) -> Result<SessionToken>;

    /// The account behind a token, or `None` for unknown/expired tokens.
    fn current_identity(&self, token: &SessionToken) -> Result<Option<User>>;

    fn revoke_session(&self, token: &SessionToken) -> Result<()>;
}

/// Provider backed by the local store and an in-process session table.
pub struct LocalIdentityProvider {
    store: SharedStore,
    sessions: SessionTable,
    trial_period: Duration,
}

impl LocalIdentityProvider {
    pub fn new(store: SharedStore, session_ttl: Duration, trial_period: Duration) -> Self {
        Self {
            store,
            sessions: SessionTable::new(session_ttl),
            trial_period,
        }
    }

    /// Create an administrator account. Used by the command line, never by
    /// the HTTP surface.
    pub fn create_administrator(&self, registration: &Registration) -> Result<User> {
        self.create(registration, Role::Administrator)
    }

    fn create(&self, registration: &Registration, role: Role) -> Result<User> {
        let now = Utc::now();
        let subscription_end = now
            .checked_add_signed(self.trial_period)
            .ok_or(Error::OutOfRange("subscription end"))?;
        let new_user = NewUser {
            username: registration.username.clone(),
            password_hash: hash_password(&registration.password)?,
            full_name: registration.full_name.clone(),
        };

        let user = self
            .store
            .with(|s| s.create_user(&new_user, role, now, subscription_end))
            .map_err(|e| match e {
                storage::Error::DuplicateUsername(name) => Error::UsernameTaken(name),
                other => Error::Storage(other),
            })?;

        info!(user_id = user.id, role = %user.role, "account created");
        Ok(user)
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn register(&self, registration: &Registration) -> Result<User> {
        self.create(registration, Role::Standard)
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<User> {
        let user = self
            .store
            .with(|s| s.get_user_by_username(&credentials.username))?
            .ok_or(Error::InvalidCredentials)?;

        if !verify_password(&credentials.password, &user.password_hash) {
            debug!(user_id = user.id, "password mismatch");
            return Err(Error::InvalidCredentials);
        }
        Ok(user)
    }

    fn issue_session(&self, user: &User) -> Result<SessionToken> {
        self.sessions.issue(user.id, Utc::now())
    }

    fn current_identity(&self, token: &SessionToken) -> Result<Option<User>> {
        let Some(user_id) = self.sessions.lookup(token, Utc::now())? else {
            return Ok(None);
        };

        let user = self.store.with(|s| s.get_user(user_id))?;
        if user.is_none() {
            self.sessions.revoke(token)?;
        }
        Ok(user)
    }

    fn revoke_session(&self, token: &SessionToken) -> Result<()> {
        self.sessions.revoke(token)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::Store;

    fn provider() -> (LocalIdentityProvider, SharedStore) {
        let store = Store::in_memory().unwrap().shared();
        let provider =
            LocalIdentityProvider::new(store.clone(), Duration::hours(1), Duration::days(30));
        (provider, store)
    }

    fn maria() -> Registration {
        Registration {
            username: "maria".into(),
            password: "s3cret".into(),
            full_name: "Maria Silva".into(),
        }
    }

    #[test]
    fn test_register_sets_trial_window() {
        let (provider, _) = provider();
        let user = provider.register(&maria()).unwrap();
        assert_eq!(user.role, Role::Standard);
        assert!(!user.blocked);
        assert_eq!(user.subscription_end - user.created_at, Duration::days(30));
        assert_ne!(user.password_hash, "s3cret");
    }

    #[test]
    fn test_register_with_unrepresentable_trial() {
        let store = Store::in_memory().unwrap().shared();
        let provider = LocalIdentityProvider::new(store.clone(), Duration::hours(1), Duration::MAX);
        assert!(matches!(
            provider.register(&maria()),
            Err(Error::OutOfRange(_))
        ));
        assert!(store.with(|s| s.list_users()).unwrap().is_empty());
    }

    #[test]
    fn test_register_duplicate_username() {
        let (provider, _) = provider();
        provider.register(&maria()).unwrap();
        assert!(matches!(
            provider.register(&maria()),
            Err(Error::UsernameTaken(name)) if name == "maria"
        ));
    }

    #[test]
    fn test_authenticate() {
        let (provider, _) = provider();
        let user = provider.register(&maria()).unwrap();

        let ok = provider
            .authenticate(&Credentials {
                username: "maria".into(),
                password: "s3cret".into(),
            })
            .unwrap();
        assert_eq!(ok.id, user.id);

        for (username, password) in [("maria", "wrong"), ("nobody", "s3cret")] {
            let err = provider
                .authenticate(&Credentials {
                    username: username.into(),
                    password: password.into(),
                })
                .unwrap_err();
            assert!(matches!(err, Error::InvalidCredentials));
        }
    }

    #[test]
    fn test_current_identity_is_read_fresh() {
        let (provider, store) = provider();
        let user = provider.register(&maria()).unwrap();
        let token = provider.issue_session(&user).unwrap();

        assert!(!provider.current_identity(&token).unwrap().unwrap().blocked);
        store.with(|s| s.set_blocked(user.id, true)).unwrap();
        assert!(provider.current_identity(&token).unwrap().unwrap().blocked);
    }

    #[test]
    fn test_revoked_session_resolves_to_none() {
        let (provider, _) = provider();
        let user = provider.register(&maria()).unwrap();
        let token = provider.issue_session(&user).unwrap();
        provider.revoke_session(&token).unwrap();
        assert!(provider.current_identity(&token).unwrap().is_none());
    }

    #[test]
    fn test_create_administrator() {
        let (provider, _) = provider();
        let admin = provider.create_administrator(&maria()).unwrap();
        assert_eq!(admin.role, Role::Administrator);
    }
}
