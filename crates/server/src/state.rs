use crate::api::{self, ApiTable};
use crate::response::ApiError;
use identity::IdentityProvider;
use std::sync::Arc;
use std::time::Duration;
use storage::{SharedStore, Store};

const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

/// Shared application state, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub identity: Arc<dyn IdentityProvider>,
    pub routes: Arc<ApiTable>,
    pub resolve_timeout: Duration,
    pub body_limit: usize,
}

impl AppState {
    /// Build state with the standard route table.
    pub fn new(store: SharedStore, identity: Arc<dyn IdentityProvider>) -> policy::Result<Self> {
        Ok(Self {
            store,
            identity,
            routes: Arc::new(api::route_table()?),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            body_limit: DEFAULT_BODY_LIMIT,
        })
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Run a store operation on the blocking pool.
    pub async fn store_task<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Store) -> storage::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        Ok(tokio::task::spawn_blocking(move || store.with(f)).await??)
    }

    /// Run an identity provider call on the blocking pool.
    pub async fn identity_task<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn IdentityProvider) -> identity::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let provider = Arc::clone(&self.identity);
        Ok(tokio::task::spawn_blocking(move || f(provider.as_ref())).await??)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use identity::{LocalIdentityProvider, Registration};

    fn state() -> AppState {
        let store = Store::in_memory().unwrap().shared();
        let provider = LocalIdentityProvider::new(
            store.clone(),
            chrono::Duration::hours(1),
            chrono::Duration::days(30),
        );
        AppState::new(store, Arc::new(provider)).unwrap()
    }

    #[tokio::test]
    async fn test_blocking_tasks_share_state() {
        let state = state();
        let user = state
            .identity_task(|id| {
                id.register(&Registration {
                    username: "maria".into(),
                    password: "s3cret".into(),
                    full_name: "Maria Silva".into(),
                })
            })
            .await
            .unwrap();

        let users = state.store_task(|s| s.list_users()).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, user.id);
    }

    #[tokio::test]
    async fn test_panicked_task_is_an_error() {
        let state = state();
        let err = state
            .store_task(|_| -> storage::Result<()> { panic!("worker died") })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Task(_)));
    }
}
