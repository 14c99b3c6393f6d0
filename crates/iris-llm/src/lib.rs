//! iris-llm: LLM backend abstraction layer.
//! Implements the LlmBackend trait used by claim extraction and the
//! router that picks a backend with ordered fallback.

pub mod backend;
pub mod router;
pub mod audit;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use router::{build_router, BackendConfig, BackendKind, LlmRouter};
