//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Write-once object store for content-addressed data.
///
/// Objects are never overwritten or deleted through this trait. Removal is
/// the job of a separate storage-maintenance process.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Publish an object only if the key is free.
    ///
    /// Returns `true` if this call created the object and `false` if it was
    /// already present. Concurrent callers for one key never observe a
    /// partially written object; exactly one of them gets `true`.
    async fn put_if_not_exists(&self, key: &str, data: Bytes) -> StorageResult<bool>;

    /// Get the name of this storage backend.
    ///
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// have nothing to check.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
