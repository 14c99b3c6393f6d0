//! Job polling.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use iris_common::IrisError;
use iris_synthesis::{JobSnapshot, JobStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::ApiError;
use crate::state::SharedState;

/// Body of every 202 response.
#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub status_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<String>,
}

impl JobAccepted {
    pub fn new(job_id: Uuid, paper_id: Option<String>) -> (StatusCode, Json<Self>) {
        let body = Self {
            job_id,
            status: JobStatus::Pending,
            status_url: format!("/api/jobs/{job_id}"),
            paper_id,
        };
        (StatusCode::ACCEPTED, Json(body))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    /// Block until the job reaches a terminal status.
    #[serde(default)]
    pub wait: bool,
}

/// GET /api/jobs/{id}[?wait=true]
pub async fn job_status(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
    Query(query): Query<JobQuery>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let id = Uuid::parse_str(&job_id)
        .map_err(|_| IrisError::InvalidRequest(format!("invalid job id: {job_id}")))?;

    let snapshot = if query.wait {
        state.jobs.handle(&id)?.wait().await
    } else {
        state.jobs.get(&id)?
    };
    Ok(Json(snapshot))
}
