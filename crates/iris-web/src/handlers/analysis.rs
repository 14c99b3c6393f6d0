//! Analysis submission.

use axum::{extract::State, response::IntoResponse, Json};
use iris_common::IrisError;
use iris_synthesis::JobKind;
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::{jobs::JobAccepted, ApiError};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub session_id: String,
    /// Required when `text` is absent; generated otherwise.
    pub paper_id: Option<String>,
    pub title: Option<String>,
    /// New text for the paper; it replaces the stored one once analysis completes.
    pub text: Option<String>,
}

/// POST /api/analyze. Runs extraction as a background job and answers 202
/// with the job id. Supplied text replaces the stored paper only when the
/// job finishes, so a failed or timed-out job leaves the previous analysis
/// in place.
pub async fn analyze(
    State(state): State<SharedState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = req.session_id;
    let (paper_id, text) = match (req.paper_id, req.text) {
        (paper_id, Some(text)) => {
            if text.trim().is_empty() {
                return Err(IrisError::InvalidRequest("paper text is empty".to_string()).into());
            }
            state.engine.snapshot(&session_id).await?;
            (paper_id.unwrap_or_else(|| Uuid::new_v4().to_string()), Some(text))
        }
        (Some(paper_id), None) => (state.engine.get_paper(&session_id, &paper_id).await?.id, None),
        (None, None) => {
            return Err(IrisError::InvalidRequest("either paper_id or text is required".to_string()).into());
        }
    };

    let engine = state.engine.clone();
    let (sid, pid, title) = (session_id.clone(), paper_id.clone(), req.title);
    let handle = state.jobs.submit(JobKind::Analysis, &session_id, Some(paper_id.clone()), async move {
        match text {
            Some(text) => engine.analyze_text(&sid, &pid, title, text).await,
            None => engine.analyze_paper(&sid, &pid).await,
        }
    });

    tracing::info!(session_id = %session_id, paper_id = %paper_id, job_id = %handle.job_id, "Analysis submitted");
    Ok(JobAccepted::new(handle.job_id, Some(paper_id)))
}
