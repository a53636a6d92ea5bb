//! Core domain types and shared logic for the FlowPan upload core.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Content, chunk and file hashes
//! - Upload plans and their size arithmetic
//! - Committed file manifests
//! - Upload session identifiers, states and wire types
//! - Events for file-tree and transcoding collaborators

pub mod chunk;
pub mod config;
pub mod error;
pub mod event;
pub mod hash;
pub mod manifest;
pub mod plan;
pub mod upload;

pub use chunk::{ChunkHash, ChunkMeta};
pub use error::{Error, Result};
pub use event::{FileCategory, FileCommitted};
pub use hash::ContentHash;
pub use manifest::{FileHash, FileManifest};
pub use plan::{PlanLimits, UploadPlan};
pub use upload::{SessionId, SessionState, TaskStatus, UploadTarget};

/// Default chunk size: 4 MiB
pub const DEFAULT_CHUNK_SIZE: u32 = 4 * 1024 * 1024;

/// Maximum chunk size: 32 MiB
pub const MAX_CHUNK_SIZE: u32 = 32 * 1024 * 1024;

/// Minimum chunk size: 64 KiB
pub const MIN_CHUNK_SIZE: u32 = 64 * 1024;

/// Maximum file size: 1 TiB
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024 * 1024;
