//! Content-addressed chunk blobs.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use bytes::Bytes;
use flowpan_core::ChunkHash;
use std::sync::Arc;
use tracing::instrument;

/// Result of storing a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// This call wrote the blob.
    Stored,
    /// A blob with this hash was already present; nothing was written.
    AlreadyExists,
}

/// Chunk blobs keyed by the SHA-256 of their bytes.
///
/// A stored blob always hashes to its key. Storing the same hash twice is a
/// no-op, and concurrent writers of one hash leave exactly one blob behind.
#[derive(Clone)]
pub struct ChunkStore {
    backend: Arc<dyn ObjectStore>,
}

impl ChunkStore {
    pub fn new(backend: Arc<dyn ObjectStore>) -> Self {
        Self { backend }
    }

    /// Underlying object store.
    pub fn backend(&self) -> &Arc<dyn ObjectStore> {
        &self.backend
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Store chunk bytes under their hash.
    ///
    /// Fails with [`StorageError::HashMismatch`] without writing anything if
    /// `data` does not hash to `hash`.
    #[instrument(skip(self, data), fields(chunk = %hash, size = data.len()))]
    pub async fn put(&self, hash: &ChunkHash, data: Bytes) -> StorageResult<PutOutcome> {
        hash.verify(&data)?;

        let created = self
            .backend
            .put_if_not_exists(&hash.to_object_key(), data)
            .await?;

        Ok(if created {
            PutOutcome::Stored
        } else {
            tracing::debug!("chunk already stored");
            PutOutcome::AlreadyExists
        })
    }

    /// Read a chunk, checking that its bytes still match the hash.
    #[instrument(skip(self), fields(chunk = %hash))]
    pub async fn get(&self, hash: &ChunkHash) -> StorageResult<Bytes> {
        let data = self.backend.get(&hash.to_object_key()).await?;
        if let Err(e) = hash.verify(&data) {
            let e = StorageError::from(e);
            tracing::error!(error = %e, "stored chunk failed verification");
            return Err(e);
        }
        Ok(data)
    }

    pub async fn exists(&self, hash: &ChunkHash) -> StorageResult<bool> {
        self.backend.exists(&hash.to_object_key()).await
    }

    pub async fn health_check(&self) -> StorageResult<()> {
        self.backend.health_check().await
    }
}
