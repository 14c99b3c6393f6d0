//! iris-web: HTTP boundary for the IRIS synthesis engine.
//! Provides a JSON API with:
//!   - Session and paper registration
//!   - Analysis and synthesis submitted as background jobs
//!   - Job polling and an SSE stream of job events
//!   - Evaluation reports and per-stage metrics

pub mod config;
pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
