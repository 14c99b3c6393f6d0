//! Synthesis submission.

use axum::{extract::State, response::IntoResponse, Json};
use iris_synthesis::JobKind;
use serde::Deserialize;

use crate::handlers::{jobs::JobAccepted, ApiError};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub session_id: String,
    #[serde(default)]
    pub paper_ids: Vec<String>,
}

/// POST /api/synthesize. Too few papers, unanalyzed papers and a synthesis
/// already running for the session are rejected before a job is created.
pub async fn synthesize(
    State(state): State<SharedState>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state.engine.reserve_synthesis(&req.session_id, &req.paper_ids).await?;
    let num_papers = ticket.paper_ids().len();

    let engine = state.engine.clone();
    let handle = state.jobs.submit(JobKind::Synthesis, &req.session_id, None, async move {
        engine.run_synthesis(ticket).await
    });

    tracing::info!(session_id = %req.session_id, num_papers, job_id = %handle.job_id, "Synthesis submitted");
    Ok(JobAccepted::new(handle.job_id, None))
}
