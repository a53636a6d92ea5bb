//! Read access to committed manifests and stored chunks.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use flowpan_core::{ChunkHash, FileHash, FileManifest};

/// GET /v1/manifests/{file_hash} - Committed manifest for a file hash.
#[tracing::instrument(skip(state))]
pub async fn get_manifest(
    State(state): State<AppState>,
    Path(file_hash): Path<String>,
) -> ApiResult<Json<FileManifest>> {
    let file_hash = FileHash::from_hex(&file_hash)
        .map_err(|e| ApiError::BadRequest(format!("invalid file hash: {e}")))?;

    let manifest = state
        .registry
        .lookup_manifest(&file_hash)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no manifest for {file_hash}")))?;

    Ok(Json(manifest.as_ref().clone()))
}

/// GET /v1/chunks/{chunk_hash} - Raw chunk bytes.
///
/// Bytes are verified against the hash before they are returned.
#[tracing::instrument(skip(state))]
pub async fn get_chunk(
    State(state): State<AppState>,
    Path(chunk_hash): Path<String>,
) -> ApiResult<Response> {
    let hash = ChunkHash::from_hex(&chunk_hash)
        .map_err(|e| ApiError::BadRequest(format!("invalid chunk hash: {e}")))?;

    let data = state.chunk_store().get(&hash).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::ETAG, format!("\"{}\"", hash.to_hex())),
        ],
        Body::from(data),
    )
        .into_response())
}
