//! Session creation, snapshot reads and paper registration.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use iris_common::{IrisError, Paper};
use serde::{Deserialize, Serialize};

use crate::handlers::ApiError;
use crate::state::SharedState;

// ── Request / response types ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPaperRequest {
    pub paper_id: Option<String>,
    pub title: Option<String>,
    pub text: String,
}

/// Paper metadata without its text.
#[derive(Debug, Serialize)]
pub struct PaperSummary {
    pub paper_id: String,
    pub title: Option<String>,
    pub num_chars: usize,
    pub analyzed: bool,
}

impl From<&Paper> for PaperSummary {
    fn from(paper: &Paper) -> Self {
        Self {
            paper_id: paper.id.clone(),
            title: paper.title.clone(),
            num_chars: paper.text.chars().count(),
            analyzed: paper.is_analyzed(),
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /api/sessions. The body is optional.
pub async fn create_session(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: CreateSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CreateSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| IrisError::InvalidRequest(e.to_string()))?
    };

    let session_id = state.engine.create_session(req.user_id).await?;
    Ok((StatusCode::CREATED, Json(CreateSessionResponse { session_id })))
}

/// GET /api/sessions/{id}
pub async fn get_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.engine.snapshot(&session_id).await?))
}

/// POST /api/sessions/{id}/papers
pub async fn register_paper(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Json(req): Json<RegisterPaperRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.engine.snapshot(&session_id).await?;
    let paper = state
        .engine
        .register_paper(&session_id, req.paper_id, req.title, req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(PaperSummary::from(&paper))))
}
