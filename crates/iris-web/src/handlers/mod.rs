//! HTTP handlers for the JSON API.

pub mod sessions;
pub mod analysis;
pub mod synthesis;
pub mod jobs;
pub mod evaluation;
pub mod metrics;
pub mod system;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use iris_common::{ErrorKind, IrisError};
use serde::Serialize;

// ── Error responses ───────────────────────────────────────────────────────────

/// Handler error: an [`IrisError`] rendered as `{ "error": { kind, message } }`.
#[derive(Debug)]
pub struct ApiError(pub IrisError);

impl From<IrisError> for ApiError {
    fn from(err: IrisError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&IrisError> for ErrorDetail {
    fn from(err: &IrisError) -> Self {
        Self { kind: err.kind(), message: err.public_message() }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InsufficientPapers
        | ErrorKind::NotAnalyzed
        | ErrorKind::InvalidRequest   => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict           => StatusCode::CONFLICT,
        ErrorKind::NotFound
        | ErrorKind::NoData           => StatusCode::NOT_FOUND,
        ErrorKind::Timeout            => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::ExtractionFailed   => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal           => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        if kind == ErrorKind::Internal {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(kind = kind.as_str(), error = %self.0, "Request rejected");
        }
        (status_for(kind), Json(ErrorBody { error: ErrorDetail::from(&self.0) })).into_response()
    }
}
