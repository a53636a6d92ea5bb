//! Capability discovery endpoint.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Capabilities response.
#[derive(Debug, Serialize)]
pub struct CapabilitiesResponse {
    /// Chunk size clients should use when they have no preference.
    pub default_chunk_size: u32,
    /// Smallest accepted chunk size (the last chunk may be shorter).
    pub min_chunk_size: u32,
    /// Largest accepted chunk size.
    pub max_chunk_size: u32,
    /// Largest accepted file.
    pub max_file_size: u64,
    /// Whether re-creating an upload resumes it.
    pub supports_resume: bool,
    /// Recommended parallel chunk upload count.
    pub recommended_parallelism: u32,
    /// API version.
    pub api_version: &'static str,
}

/// GET /v1/capabilities
pub async fn get_capabilities(
    State(state): State<AppState>,
) -> ApiResult<Json<CapabilitiesResponse>> {
    let upload = &state.config.upload;
    Ok(Json(CapabilitiesResponse {
        default_chunk_size: upload.default_chunk_size,
        min_chunk_size: upload.min_chunk_size,
        max_chunk_size: upload.max_chunk_size,
        max_file_size: upload.max_file_size,
        supports_resume: true,
        recommended_parallelism: upload.max_parallel_chunks,
        api_version: "v1",
    }))
}
