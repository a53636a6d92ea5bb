//! Health check endpoint.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub storage_backend: &'static str,
    /// Non-terminal upload sessions.
    pub active_sessions: usize,
}

/// GET /v1/health
///
/// Unauthenticated for load balancer probes. Fails with 503 when the chunk
/// store cannot be reached.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let store = state.chunk_store();
    store
        .health_check()
        .await
        .map_err(|e| ApiError::Unavailable(format!("storage backend: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage_backend: store.backend_name(),
        active_sessions: state.registry.active_count(),
    }))
}
