//! Metadata services: the key space, the transactional store, and the
//! registries built on top of it.

pub mod bucket_service;
pub mod error;
pub mod keyspace;
pub mod kv_store;
pub mod notification_validator;
pub mod subresource_service;
pub mod target_service;

use std::future::Future;
use tracing::debug;

pub use error::{ErrorKind, MetadataError, MetadataResult};

/// Run a write operation, retrying it exactly once if the store reports a
/// write conflict. A second conflict is returned to the caller.
pub(crate) async fn with_conflict_retry<T, F, Fut>(
    op: &'static str,
    mut attempt: F,
) -> MetadataResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MetadataResult<T>>,
{
    match attempt().await {
        Err(err) if err.is_conflict() => {
            debug!(op, "write conflict, retrying once");
            attempt().await
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::kv_store::{KvStore, StoreOptions};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// A fresh store in its own directory; keep the `TempDir` alive for the test.
    pub async fn temp_store() -> (TempDir, Arc<KvStore>) {
        let dir = TempDir::new().unwrap();
        let store = KvStore::open_path(dir.path().join("meta.db"), &StoreOptions::default())
            .await
            .unwrap();
        (dir, Arc::new(store))
    }
}
