use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IrisError {
    #[error("Synthesis needs at least 2 analyzed papers, got {found}")]
    InsufficientPapers { found: usize },

    #[error("Paper {paper_id} has not been analyzed yet")]
    NotAnalyzed { paper_id: String },

    #[error("A synthesis is already running for session {session_id}")]
    Conflict { session_id: String },

    #[error("Session {session_id} has no analyzed papers")]
    NoData { session_id: String },

    #[error("Claim extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Paper not found: {0}")]
    PaperNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, IrisError>;

/// Stable, caller-facing classification of an [`IrisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientPapers,
    NotAnalyzed,
    Conflict,
    NoData,
    ExtractionFailed,
    NotFound,
    Timeout,
    InvalidRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InsufficientPapers => "insufficient_papers",
            ErrorKind::NotAnalyzed        => "not_analyzed",
            ErrorKind::Conflict           => "conflict",
            ErrorKind::NoData             => "no_data",
            ErrorKind::ExtractionFailed   => "extraction_failed",
            ErrorKind::NotFound           => "not_found",
            ErrorKind::Timeout            => "timeout",
            ErrorKind::InvalidRequest     => "invalid_request",
            ErrorKind::Internal           => "internal",
        }
    }
}

impl IrisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IrisError::InsufficientPapers { .. } => ErrorKind::InsufficientPapers,
            IrisError::NotAnalyzed { .. }        => ErrorKind::NotAnalyzed,
            IrisError::Conflict { .. }           => ErrorKind::Conflict,
            IrisError::NoData { .. }             => ErrorKind::NoData,
            IrisError::ExtractionFailed(_)       => ErrorKind::ExtractionFailed,
            IrisError::PaperNotFound(_)
            | IrisError::JobNotFound(_)
            | IrisError::SessionNotFound(_)      => ErrorKind::NotFound,
            IrisError::Timeout(_)                => ErrorKind::Timeout,
            IrisError::Config(_)
            | IrisError::InvalidRequest(_)       => ErrorKind::InvalidRequest,
            IrisError::Store(_)
            | IrisError::Serialization(_)
            | IrisError::Other(_)                => ErrorKind::Internal,
        }
    }

    /// Message safe to hand to a caller. Internal failures are reduced to a
    /// generic sentence; their detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal error while processing the request".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(IrisError::InsufficientPapers { found: 1 }.kind(), ErrorKind::InsufficientPapers);
        assert_eq!(IrisError::Conflict { session_id: "s".into() }.kind(), ErrorKind::Conflict);
        assert_eq!(IrisError::PaperNotFound("p".into()).kind(), ErrorKind::NotFound);
        assert_eq!(ErrorKind::NotAnalyzed.as_str(), "not_analyzed");
    }

    #[test]
    fn test_internal_detail_not_leaked() {
        let err = IrisError::Store("poisoned lock on shard 3".into());
        assert!(!err.public_message().contains("shard"));

        let err = IrisError::NotAnalyzed { paper_id: "p1".into() };
        assert!(err.public_message().contains("p1"));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientPapers).unwrap();
        assert_eq!(json, "\"insufficient_papers\"");
    }
}
