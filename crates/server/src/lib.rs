//! HTTP API server for the FlowPan upload core.
//!
//! This crate provides the HTTP control plane:
//! - Upload session creation, resume and instant completion
//! - Chunk upload endpoints
//! - Session status and abort
//! - Manifest and chunk read-back
//! - Background expiry sweeper and committed-file consumer

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod tasks;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
