//! Upload session handlers.

use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    ACTIVE_UPLOAD_SESSIONS, CHUNK_RECEIVE_DURATION, INSTANT_UPLOADS, UPLOAD_SESSIONS_ABORTED,
    UPLOAD_SESSIONS_COMMITTED, UPLOAD_SESSIONS_CREATED, UPLOAD_SESSIONS_RESUMED,
    record_chunk_receipt, record_expired_sessions, record_upload_error,
};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use flowpan_core::upload::{
    AbortSessionResponse, CreateSessionRequest, CreateSessionResponse, SessionStatusResponse,
    UploadChunkResponse,
};
use flowpan_core::{ChunkHash, SessionId, SessionState};
use flowpan_engine::{CreateOutcome, UploadError};
use serde::Serialize;
use std::time::Instant;

/// Count engine errors before handing them to the API error mapping.
fn observe<T>(result: Result<T, UploadError>) -> ApiResult<T> {
    result.map_err(|e| {
        record_upload_error(&e);
        ApiError::from(e)
    })
}

fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid session ID: {e}")))
}

/// POST /v1/uploads - Create or resume an upload session.
///
/// Returns 201 for a new session, and 200 when an existing session was
/// resumed or the file was already stored.
#[tracing::instrument(skip(state, req), fields(owner_id, file_hash))]
pub async fn create_upload(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<(StatusCode, Json<CreateSessionResponse>)> {
    let body: CreateSessionRequest = {
        let bytes =
            axum::body::to_bytes(req.into_body(), state.config.server.max_create_body_bytes)
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))?
    };

    if body.owner_id.trim().is_empty() {
        return Err(ApiError::BadRequest("owner_id must not be empty".to_string()));
    }
    if body.target.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let span = tracing::Span::current();
    span.record("owner_id", body.owner_id.as_str());
    span.record("file_hash", tracing::field::display(&body.plan.file_hash));

    let outcome = state
        .registry
        .create_session(&body.owner_id, body.target, body.plan)
        .await;
    record_expired_sessions(&state.registry);
    let outcome = observe(outcome)?;

    let status = match &outcome {
        CreateOutcome::Session { resumed: true, .. } => {
            UPLOAD_SESSIONS_RESUMED.inc();
            StatusCode::OK
        }
        CreateOutcome::Session { session, .. } => {
            UPLOAD_SESSIONS_CREATED.inc();
            // Empty files commit while the session is created.
            if session.state() == SessionState::Committed {
                UPLOAD_SESSIONS_COMMITTED.inc();
            }
            StatusCode::CREATED
        }
        CreateOutcome::InstantComplete(_) => {
            INSTANT_UPLOADS.inc();
            StatusCode::OK
        }
    };
    ACTIVE_UPLOAD_SESSIONS.set(state.registry.active_count() as i64);

    let response = outcome.into_response(state.registry.settings().max_parallel_chunks);
    Ok((status, Json(response)))
}

/// Session status with the client-facing progress fraction.
#[derive(Debug, Serialize)]
pub struct SessionStatusBody {
    #[serde(flatten)]
    pub status: SessionStatusResponse,
    /// Received chunks over total chunks.
    pub progress: f64,
}

/// GET /v1/uploads/{session_id} - Get session state and missing chunks.
#[tracing::instrument(skip(state))]
pub async fn get_upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionStatusBody>> {
    let session_id = parse_session_id(&session_id)?;
    let status = state.registry.session_status(session_id);
    record_expired_sessions(&state.registry);
    let status = observe(status)?;
    let progress = status.progress();
    Ok(Json(SessionStatusBody { status, progress }))
}

/// PUT /v1/uploads/{session_id}/chunks/{index}/{chunk_hash} - Upload one chunk.
///
/// The request body is the raw chunk bytes.
#[tracing::instrument(skip(state, req, chunk_hash))]
pub async fn upload_chunk(
    State(state): State<AppState>,
    Path((session_id, index, chunk_hash)): Path<(String, u32, String)>,
    req: Request,
) -> ApiResult<Json<UploadChunkResponse>> {
    let start_time = Instant::now();

    let session_id = parse_session_id(&session_id)?;
    let hash = ChunkHash::from_hex(&chunk_hash)
        .map_err(|e| ApiError::BadRequest(format!("invalid chunk hash: {e}")))?;

    let data = axum::body::to_bytes(
        req.into_body(),
        state.config.upload.max_chunk_size as usize,
    )
    .await
    .map_err(|e| ApiError::BadRequest(format!("failed to read chunk: {e}")))?;

    let receipt = state
        .registry
        .receive_chunk(session_id, index, hash, data)
        .await;
    record_expired_sessions(&state.registry);
    let receipt = observe(receipt)?;

    record_chunk_receipt(&receipt);
    CHUNK_RECEIVE_DURATION.observe(start_time.elapsed().as_secs_f64());
    if receipt.committed.is_some() {
        ACTIVE_UPLOAD_SESSIONS.set(state.registry.active_count() as i64);
    }

    Ok(Json(receipt.to_response()))
}

/// POST /v1/uploads/{session_id}/abort - Cancel an upload.
#[tracing::instrument(skip(state))]
pub async fn abort_upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<AbortSessionResponse>> {
    let session_id = parse_session_id(&session_id)?;
    let before = state.registry.get(&session_id).map(|s| s.state());
    let final_state = state.registry.abort_session(session_id);
    record_expired_sessions(&state.registry);
    let final_state = observe(final_state)?;

    if final_state == SessionState::Aborted && before != Some(SessionState::Aborted) {
        UPLOAD_SESSIONS_ABORTED.inc();
        ACTIVE_UPLOAD_SESSIONS.set(state.registry.active_count() as i64);
    }

    Ok(Json(AbortSessionResponse {
        ok: true,
        state: final_state,
    }))
}
