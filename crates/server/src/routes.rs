//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Capability discovery
        .route("/v1/capabilities", get(handlers::get_capabilities))
        // Health check (unauthenticated for load balancers/k8s probes)
        .route("/v1/health", get(handlers::health_check))
        // Upload control plane
        .route("/v1/uploads", post(handlers::create_upload))
        .route("/v1/uploads/{session_id}", get(handlers::get_upload))
        .route(
            "/v1/uploads/{session_id}/chunks/{index}/{chunk_hash}",
            put(handlers::upload_chunk),
        )
        .route(
            "/v1/uploads/{session_id}/abort",
            post(handlers::abort_upload),
        )
        // Committed content
        .route("/v1/manifests/{file_hash}", get(handlers::get_manifest))
        .route("/v1/chunks/{chunk_hash}", get(handlers::get_chunk));

    let mut router = Router::new().merge(api_routes);

    // SECURITY: When enabled, this endpoint MUST be network-restricted
    // to authorized Prometheus scraper IPs only.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
