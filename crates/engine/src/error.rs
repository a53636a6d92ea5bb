//! Upload error taxonomy.

use flowpan_core::{ChunkHash, FileHash, SessionId, SessionState};
use flowpan_storage::StorageError;
use thiserror::Error;

/// How callers should treat an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request is wrong; retrying it unchanged fails the same way.
    Client,
    /// The content contradicts what is already committed. Fatal for the session.
    Conflict,
    /// Infrastructure failure; the same request may be retried.
    Transient,
}

/// Errors returned by upload operations.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid upload plan: {0}")]
    InvalidPlan(String),

    #[error("chunk {index} does not match the plan: expected {expected}, got {actual}")]
    PlanMismatch {
        index: u32,
        expected: ChunkHash,
        actual: ChunkHash,
    },

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("chunk index {index} out of range (session has {total} chunks)")]
    ChunkIndexOutOfRange { index: u32, total: u32 },

    #[error("chunk {index} has {actual} bytes, plan requires {expected}")]
    ChunkSizeMismatch {
        index: u32,
        expected: u32,
        actual: usize,
    },

    #[error("upload session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("upload session expired: {0}")]
    SessionExpired(SessionId),

    #[error("upload session {session_id} is {state}")]
    SessionTerminal {
        session_id: SessionId,
        state: SessionState,
    },

    #[error("file {file_hash} is already committed with different content")]
    IntegrityConflict { file_hash: FileHash },

    #[error("declared file hash {declared} does not match chunk list ({computed})")]
    FileHashMismatch {
        declared: FileHash,
        computed: FileHash,
    },

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl UploadError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPlan(_) => "invalid_plan",
            Self::PlanMismatch { .. } => "plan_mismatch",
            Self::HashMismatch { .. } => "hash_mismatch",
            Self::ChunkIndexOutOfRange { .. } => "chunk_index_out_of_range",
            Self::ChunkSizeMismatch { .. } => "chunk_size_mismatch",
            Self::SessionNotFound(_) => "session_not_found",
            Self::SessionExpired(_) => "session_expired",
            Self::SessionTerminal { .. } => "session_terminal",
            Self::IntegrityConflict { .. } => "integrity_conflict",
            Self::FileHashMismatch { .. } => "file_hash_mismatch",
            Self::Storage(_) => "storage_unavailable",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::IntegrityConflict { .. } | Self::FileHashMismatch { .. } => ErrorClass::Conflict,
            Self::Storage(_) => ErrorClass::Transient,
            _ => ErrorClass::Client,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

impl From<StorageError> for UploadError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::HashMismatch { expected, actual } => {
                Self::HashMismatch { expected, actual }
            }
            other => Self::Storage(other),
        }
    }
}

impl From<flowpan_core::Error> for UploadError {
    fn from(err: flowpan_core::Error) -> Self {
        match err {
            flowpan_core::Error::HashMismatch { expected, actual } => {
                Self::HashMismatch { expected, actual }
            }
            other => Self::InvalidPlan(other.to_string()),
        }
    }
}

/// Result type for upload operations.
pub type Result<T> = std::result::Result<T, UploadError>;
