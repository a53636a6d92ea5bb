//! Object storage abstraction and backends for FlowPan.
//!
//! This crate provides:
//! - A write-once object store trait
//! - Content-addressed chunk storage with atomic, first-writer-wins publishes
//! - Backends: local filesystem and process memory

pub mod backends;
pub mod chunk_store;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend};
pub use chunk_store::{ChunkStore, PutOutcome};
pub use error::{StorageError, StorageResult};
pub use traits::ObjectStore;

use flowpan_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            tracing::info!(path = %path.display(), "using filesystem chunk storage");
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => {
            tracing::warn!("using in-memory chunk storage; contents are lost on restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}
