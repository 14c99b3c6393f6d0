//! Per-stage pipeline metrics.

use axum::{extract::State, Json};
use iris_synthesis::metrics::StageSnapshot;
use serde::Serialize;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub uptime_secs: u64,
    pub jobs_tracked: usize,
    pub stages: Vec<StageSnapshot>,
}

/// GET /api/metrics
pub async fn metrics(State(state): State<SharedState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        jobs_tracked: state.jobs.len(),
        stages: state.engine.metrics().snapshot(),
    })
}
