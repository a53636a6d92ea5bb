//! File-hash index of committed manifests.

use crate::error::{Result, UploadError};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flowpan_core::{FileHash, FileManifest};
use std::sync::Arc;

/// Outcome of registering a manifest.
#[derive(Clone, Debug)]
pub enum RegisterOutcome {
    /// The manifest is new.
    Inserted(Arc<FileManifest>),
    /// An identical manifest was already registered; it is returned unchanged.
    Existing(Arc<FileManifest>),
}

impl RegisterOutcome {
    pub fn manifest(&self) -> &Arc<FileManifest> {
        match self {
            Self::Inserted(m) | Self::Existing(m) => m,
        }
    }

    pub fn into_manifest(self) -> Arc<FileManifest> {
        match self {
            Self::Inserted(m) | Self::Existing(m) => m,
        }
    }
}

/// Maps file hashes to committed manifests.
///
/// This is the dedup table behind instant upload: a hit at session creation
/// means no chunk ever needs to be transferred.
#[async_trait]
pub trait HashIndex: Send + Sync + 'static {
    /// Find the manifest committed under `file_hash`.
    async fn lookup(&self, file_hash: &FileHash) -> Result<Option<Arc<FileManifest>>>;

    /// Register a manifest.
    ///
    /// Registering the same content twice returns the first manifest. A
    /// manifest whose hash is taken by different content fails with
    /// [`UploadError::IntegrityConflict`].
    async fn register(&self, manifest: FileManifest) -> Result<RegisterOutcome>;

    /// Number of registered manifests.
    async fn len(&self) -> Result<usize>;
}

/// Process-local hash index backed by a sharded map.
#[derive(Default)]
pub struct InMemoryHashIndex {
    manifests: DashMap<FileHash, Arc<FileManifest>>,
}

impl InMemoryHashIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HashIndex for InMemoryHashIndex {
    async fn lookup(&self, file_hash: &FileHash) -> Result<Option<Arc<FileManifest>>> {
        Ok(self.manifests.get(file_hash).map(|m| m.value().clone()))
    }

    async fn register(&self, manifest: FileManifest) -> Result<RegisterOutcome> {
        match self.manifests.entry(manifest.file_hash) {
            Entry::Occupied(existing) => {
                if existing.get().same_content(&manifest) {
                    Ok(RegisterOutcome::Existing(existing.get().clone()))
                } else {
                    Err(UploadError::IntegrityConflict {
                        file_hash: manifest.file_hash,
                    })
                }
            }
            Entry::Vacant(slot) => {
                let manifest = Arc::new(manifest);
                slot.insert(manifest.clone());
                Ok(RegisterOutcome::Inserted(manifest))
            }
        }
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.manifests.len())
    }
}
