//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("invalid chunk size: {size} (must be between {min} and {max})")]
    InvalidChunkSize { size: u64, min: u64, max: u64 },

    #[error("invalid upload plan: {0}")]
    InvalidPlan(String),

    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
