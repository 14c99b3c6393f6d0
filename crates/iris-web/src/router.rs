//! Axum router: maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    sessions::{create_session, get_session, register_paper},
    analysis::analyze,
    synthesis::synthesize,
    jobs::job_status,
    evaluation::evaluation,
    metrics::metrics,
    system::health,
};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Sessions
        .route("/api/sessions",             post(create_session))
        .route("/api/sessions/{id}",        get(get_session))
        .route("/api/sessions/{id}/papers", post(register_paper))

        // Pipeline
        .route("/api/analyze",    post(analyze))
        .route("/api/synthesize", post(synthesize))
        .route("/api/jobs/{id}",  get(job_status))
        .route("/api/evaluation/{session_id}", get(evaluation))

        // Observability
        .route("/api/metrics", get(metrics))
        .route("/api/events",  get(sse_handler))
        .route("/health",      get(health))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
