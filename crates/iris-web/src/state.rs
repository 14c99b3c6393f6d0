//! Shared application state for the web server.

use std::sync::Arc;
use std::time::Instant;

use iris_ingestion::{ClaimExtractor, HeuristicExtractor, LlmClaimExtractor};
use iris_llm::{build_router, LlmBackend};
use iris_synthesis::{InMemorySessionStore, JobEvent, JobRegistry, SynthesisEngine};
use tokio::sync::broadcast;

use crate::config::Config;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub engine: Arc<SynthesisEngine>,
    /// Background analysis / synthesis jobs; also the SSE event source
    pub jobs: Arc<JobRegistry>,
    /// Model id reported by /health ("heuristic" when no backend is configured)
    pub llm_model: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<SynthesisEngine>, jobs: Arc<JobRegistry>, llm_model: impl Into<String>) -> Self {
        Self { engine, jobs, llm_model: llm_model.into(), started_at: Instant::now() }
    }

    /// Wire the engine, extractor and job registry from server config.
    pub fn from_config(config: &Config) -> Self {
        let router = build_router(config.backend_configs(), config.llm.default_backend.clone());

        let (extractor, llm_model): (Arc<dyn ClaimExtractor>, String) = if router.is_empty() {
            let extractor = HeuristicExtractor::new(config.engine.extraction.clone());
            (Arc::new(extractor), "heuristic".to_string())
        } else {
            tracing::info!(backends = ?router.backend_names(), "LLM router ready");
            let model = router.model_id().to_string();
            let backend: Arc<dyn LlmBackend> = Arc::new(router);
            (Arc::new(LlmClaimExtractor::new(backend, config.engine.extraction.clone())), model)
        };

        let store = Arc::new(InMemorySessionStore::new());
        let engine = Arc::new(SynthesisEngine::new(store, extractor, config.engine.clone()));
        let jobs = Arc::new(JobRegistry::new(&config.engine.jobs));
        Self::new(engine, jobs, llm_model)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.jobs.subscribe()
    }
}

pub type SharedState = Arc<AppState>;
