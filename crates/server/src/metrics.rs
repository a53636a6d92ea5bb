//! Prometheus metrics for the FlowPan server.
//!
//! Exposes metrics for upload sessions, chunk deduplication and instant
//! uploads. Metrics carry no owner ids, names or hashes.
//!
//! The `/metrics` endpoint is unauthenticated for Prometheus scraping and
//! should be network-restricted to scraper IPs.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use flowpan_engine::{ChunkReceipt, SessionRegistry, UploadError};
use flowpan_storage::PutOutcome;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Upload session metrics
pub static UPLOAD_SESSIONS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_upload_sessions_created_total",
        "Total number of upload sessions created",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_SESSIONS_RESUMED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_upload_sessions_resumed_total",
        "Total number of create requests that resumed a live session",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_SESSIONS_COMMITTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_upload_sessions_committed_total",
        "Total number of upload sessions committed",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_SESSIONS_ABORTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_upload_sessions_aborted_total",
        "Total number of upload sessions aborted by clients",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_SESSIONS_EXPIRED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_upload_sessions_expired_total",
        "Total number of upload sessions expired by the sweeper",
    )
    .expect("metric creation failed")
});

pub static INSTANT_UPLOADS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_instant_uploads_total",
        "Total number of uploads completed from an existing manifest",
    )
    .expect("metric creation failed")
});

// Chunk metrics
pub static CHUNKS_STORED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_chunks_stored_total",
        "Total number of chunks written to storage",
    )
    .expect("metric creation failed")
});

pub static CHUNKS_DEDUPLICATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_chunks_deduplicated_total",
        "Total number of received chunks that were already stored",
    )
    .expect("metric creation failed")
});

pub static BYTES_STORED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_bytes_stored_total",
        "Total bytes written to storage (new chunks only)",
    )
    .expect("metric creation failed")
});

pub static BYTES_DEDUPLICATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_bytes_deduplicated_total",
        "Total bytes received for chunks that were already stored",
    )
    .expect("metric creation failed")
});

// Timing metrics
pub static CHUNK_RECEIVE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "flowpan_chunk_receive_duration_seconds",
            "Time taken to receive, verify and store a single chunk",
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("metric creation failed")
});

// Error metrics
pub static CHUNK_HASH_MISMATCHES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_chunk_hash_mismatches_total",
        "Total number of chunks whose bytes did not match their hash",
    )
    .expect("metric creation failed")
});

pub static PLAN_MISMATCHES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_plan_mismatches_total",
        "Total number of chunks whose hash differed from the upload plan",
    )
    .expect("metric creation failed")
});

pub static INTEGRITY_CONFLICTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flowpan_integrity_conflicts_total",
        "Total number of sessions failed by a manifest conflict",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "flowpan_upload_errors_total",
            "Total upload errors by error type",
        ),
        &["error_type"],
    )
    .expect("metric creation failed")
});

// Current state gauges
pub static ACTIVE_UPLOAD_SESSIONS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "flowpan_active_upload_sessions",
        "Current number of non-terminal upload sessions",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Safe to call more than once.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(UPLOAD_SESSIONS_CREATED.clone()),
            Box::new(UPLOAD_SESSIONS_RESUMED.clone()),
            Box::new(UPLOAD_SESSIONS_COMMITTED.clone()),
            Box::new(UPLOAD_SESSIONS_ABORTED.clone()),
            Box::new(UPLOAD_SESSIONS_EXPIRED.clone()),
            Box::new(INSTANT_UPLOADS.clone()),
            Box::new(CHUNKS_STORED.clone()),
            Box::new(CHUNKS_DEDUPLICATED.clone()),
            Box::new(BYTES_STORED.clone()),
            Box::new(BYTES_DEDUPLICATED.clone()),
            Box::new(CHUNK_RECEIVE_DURATION.clone()),
            Box::new(CHUNK_HASH_MISMATCHES.clone()),
            Box::new(PLAN_MISMATCHES.clone()),
            Box::new(INTEGRITY_CONFLICTS.clone()),
            Box::new(UPLOAD_ERRORS.clone()),
            Box::new(ACTIVE_UPLOAD_SESSIONS.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("metric registration failed");
        }
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Helper to record upload errors by type.
pub fn record_upload_error(err: &UploadError) {
    match err {
        UploadError::HashMismatch { .. } => CHUNK_HASH_MISMATCHES.inc(),
        UploadError::PlanMismatch { .. } => PLAN_MISMATCHES.inc(),
        UploadError::IntegrityConflict { .. } | UploadError::FileHashMismatch { .. } => {
            INTEGRITY_CONFLICTS.inc()
        }
        _ => {}
    }
    UPLOAD_ERRORS.with_label_values(&[err.code()]).inc();
}

/// Record what storing one chunk did.
pub fn record_chunk_receipt(receipt: &ChunkReceipt) {
    let size = receipt.size as u64;
    match receipt.stored {
        Some(PutOutcome::Stored) => {
            CHUNKS_STORED.inc();
            BYTES_STORED.inc_by(size);
        }
        Some(PutOutcome::AlreadyExists) => {
            CHUNKS_DEDUPLICATED.inc();
            BYTES_DEDUPLICATED.inc_by(size);
        }
        None => {}
    }
    if receipt.committed.is_some() {
        UPLOAD_SESSIONS_COMMITTED.inc();
    }
}

/// Publish expiries the registry found since the last call.
///
/// Sessions expire both in the sweeper and lazily inside requests, so every
/// path that touches the registry reports through here.
pub fn record_expired_sessions(registry: &SessionRegistry) {
    let expired = registry.take_expired();
    if expired > 0 {
        UPLOAD_SESSIONS_EXPIRED.inc_by(expired);
        ACTIVE_UPLOAD_SESSIONS.set(registry.active_count() as i64);
    }
}
