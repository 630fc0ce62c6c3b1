//! In-process session tokens.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use uuid::Uuid;

/// Opaque bearer token handed to a signed-in client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap a token presented by a client. Unknown tokens simply fail lookup.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

/// Token -> user id map with a fixed time-to-live.
///
/// Only the user id is kept; the account itself is re-read on every lookup.
#[derive(Debug)]
pub struct SessionTable {
    ttl: Duration,
    entries: RwLock<HashMap<SessionToken, Entry>>,
}

impl SessionTable {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a fresh token. Expired entries are swept out on the way.
    pub fn issue(&self, user_id: i64, now: DateTime<Utc>) -> Result<SessionToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(Error::OutOfRange("session expiry"))?;
        let token = SessionToken::generate();

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.retain(|_, e| now < e.expires_at);
        entries.insert(token.clone(), Entry { user_id, expires_at });
        Ok(token)
    }

    /// User id for a live token. Expired tokens are dropped.
    pub fn lookup(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Option<i64>> {
        let entry = self
            .entries
            .read()
            .map_err(|_| poisoned())?
            .get(token)
            .copied();

        match entry {
            Some(entry) if now < entry.expires_at => Ok(Some(entry.user_id)),
            Some(_) => {
                self.revoke(token)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Returns true if the token existed.
    pub fn revoke(&self, token: &SessionToken) -> Result<bool> {
        let removed = self
            .entries
            .write()
            .map_err(|_| poisoned())?
            .remove(token);
        Ok(removed.is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> Error {
    Error::Unavailable("session table lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_lookup() {
        let table = SessionTable::new(Duration::hours(1));
        let now = Utc::now();
        let token = table.issue(7, now).unwrap();
        assert_eq!(table.lookup(&token, now).unwrap(), Some(7));
        assert_eq!(table.lookup(&SessionToken::new("nope"), now).unwrap(), None);
    }

    #[test]
    fn test_expired_token_is_pruned() {
        let table = SessionTable::new(Duration::hours(1));
        let now = Utc::now();
        let token = table.issue(7, now).unwrap();
        assert_eq!(table.lookup(&token, now + Duration::hours(2)).unwrap(), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_issue_sweeps_abandoned_tokens() {
        let table = SessionTable::new(Duration::hours(1));
        let now = Utc::now();
        let stale = table.issue(7, now).unwrap();
        let later = now + Duration::hours(2);
        let fresh = table.issue(8, later).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&stale, later).unwrap(), None);
        assert_eq!(table.lookup(&fresh, later).unwrap(), Some(8));
    }

    #[test]
    fn test_expiry_overflow_is_an_error() {
        let table = SessionTable::new(Duration::MAX);
        assert!(matches!(
            table.issue(7, Utc::now()),
            Err(Error::OutOfRange(_))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_revoke() {
        let table = SessionTable::new(Duration::hours(1));
        let now = Utc::now();
        let token = table.issue(7, now).unwrap();
        assert!(table.revoke(&token).unwrap());
        assert!(!table.revoke(&token).unwrap());
        assert_eq!(table.lookup(&token, now).unwrap(), None);
    }
}
