//! Evaluation report.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use iris_common::IrisError;
use iris_synthesis::EvaluationReport;
use serde::Serialize;

use crate::handlers::{ApiError, ErrorDetail};
use crate::state::SharedState;

/// `NoData` body: the error plus an explicit empty report.
#[derive(Debug, Serialize)]
pub struct NoDataBody {
    pub error: ErrorDetail,
    pub report: EvaluationReport,
}

/// GET /api/evaluation/{session_id}
pub async fn evaluation(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.engine.evaluate(&session_id).await {
        Ok(report) => Json(report).into_response(),
        Err(err @ IrisError::NoData { .. }) => {
            let body = NoDataBody {
                error: ErrorDetail::from(&err),
                report: EvaluationReport::empty(&session_id),
            };
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(err) => ApiError(err).into_response(),
    }
}
