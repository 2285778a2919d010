use crate::domain::EntityStore;
use crate::errors::{RepoError, ServiceError};
use std::{future::Future, sync::Arc, time::Duration};

/// Shared access to the entity store with a per-call time budget.
///
/// Every core component goes through [`StoreHandle::call`], so a slow or
/// failing backend always surfaces as `ServiceError::Unavailable` instead of
/// hanging the request.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn EntityStore>,
    timeout: Duration,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn EntityStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    /// Runs one store operation under the time budget.
    pub async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, RepoError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| ServiceError::from_repo(operation, e)),
            Err(elapsed) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(ServiceError::unavailable(operation, elapsed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryStore;

    fn handle(timeout: Duration) -> StoreHandle {
        StoreHandle::new(Arc::new(MemoryStore::default()), timeout)
    }

    #[tokio::test]
    async fn stalled_calls_fail_as_unavailable() {
        let handle = handle(Duration::from_millis(20));
        let err = handle
            .call("list the memes", std::future::pending::<Result<(), RepoError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable { operation: "list the memes", .. }));
    }

    #[tokio::test]
    async fn backend_errors_fail_as_unavailable() {
        let handle = handle(Duration::from_secs(1));
        let err = handle
            .call("favourite the community", async {
                Err::<(), _>(RepoError::BackendError(anyhow::anyhow!("throttled")))
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to favourite the community");
    }

    #[tokio::test]
    async fn successful_calls_pass_through() {
        let handle = handle(Duration::from_secs(1));
        let value = handle.call("count", async { Ok::<_, RepoError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
