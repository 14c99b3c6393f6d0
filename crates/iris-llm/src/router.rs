//! LLM router: picks a backend for each request with ordered fallback.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::backend::{
    GeminiBackend, LlmBackend, LlmError, LlmRequest, LlmResponse, OllamaBackend,
    OpenAiCompatibleBackend, ScriptedBackend,
};

/// Which concrete backend a [`BackendConfig`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gemini,
    Ollama,
    OpenAiCompatible,
    Mock,
}

/// Everything needed to construct one backend.
#[derive(Debug)]
pub struct BackendConfig {
    pub name: String,
    pub kind: BackendKind,
    pub model: String,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
}

/// Routes requests to the default backend, then to the others in
/// registration order until one succeeds.
pub struct LlmRouter {
    backends: Vec<(String, Arc<dyn LlmBackend>)>,
    default_backend: Option<String>,
}

impl LlmRouter {
    pub fn new(default_backend: Option<String>) -> Self {
        Self { backends: Vec::new(), default_backend }
    }

    pub fn register_backend(&mut self, name: impl Into<String>, backend: Arc<dyn LlmBackend>) {
        self.backends.push((name.into(), backend));
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Backends in the order they are tried.
    fn ordered(&self) -> Vec<&(String, Arc<dyn LlmBackend>)> {
        let mut ordered: Vec<_> = self.backends.iter().collect();
        if let Some(default) = &self.default_backend {
            ordered.sort_by_key(|(name, _)| name != default);
        }
        ordered
    }

    /// Route a request, falling through to the next backend on error.
    pub async fn route(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut last_err = None;
        for (name, backend) in self.ordered() {
            match backend.complete(req.clone()).await {
                Ok(resp) => {
                    tracing::debug!(backend = %name, model = backend.model_id(), "LLM request routed");
                    return Ok(resp);
                }
                Err(e) => {
                    tracing::warn!(backend = %name, error = %e, "LLM backend failed, trying next");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| LlmError::Unavailable("no LLM backend configured".to_string())))
    }
}

#[async_trait]
impl LlmBackend for LlmRouter {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.route(req).await
    }

    fn model_id(&self) -> &str {
        let preferred = self.default_backend.as_ref()
            .and_then(|d| self.backends.iter().find(|(name, _)| name == d));
        preferred
            .or_else(|| self.backends.first())
            .map(|(_, b)| b.model_id())
            .unwrap_or("none")
    }

    fn is_local(&self) -> bool {
        self.backends.iter().all(|(_, b)| b.is_local())
    }
}

/// Build a router from backend configs. Configs missing a required key or
/// URL are skipped with a warning.
pub fn build_router(configs: Vec<BackendConfig>, default_backend: Option<String>) -> LlmRouter {
    let mut router = LlmRouter::new(default_backend);

    for cfg in configs {
        let backend: Arc<dyn LlmBackend> = match cfg.kind {
            BackendKind::Gemini => match cfg.api_key {
                Some(key) => Arc::new(GeminiBackend::new(key, cfg.model)),
                None => {
                    tracing::warn!(backend = %cfg.name, "Gemini configured without an API key, skipping");
                    continue;
                }
            },
            BackendKind::Ollama => {
                let url = cfg.base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
                Arc::new(OllamaBackend::new(url, cfg.model))
            }
            BackendKind::OpenAiCompatible => match cfg.base_url {
                Some(url) => Arc::new(OpenAiCompatibleBackend::new(url, cfg.model, cfg.api_key)),
                None => {
                    tracing::warn!(backend = %cfg.name, "OpenAI-compatible backend needs base_url, skipping");
                    continue;
                }
            },
            BackendKind::Mock => Arc::new(ScriptedBackend::echo()),
        };
        router.register_backend(cfg.name, backend);
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_cfg(name: &str) -> BackendConfig {
        BackendConfig {
            name: name.to_string(),
            kind: BackendKind::Mock,
            model: "mock".to_string(),
            api_key: None,
            base_url: None,
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_next_backend() {
        let mut router = LlmRouter::new(Some("primary".to_string()));
        router.register_backend("secondary", Arc::new(ScriptedBackend::always("ok")));
        router.register_backend("primary", Arc::new(ScriptedBackend::failing()));

        let resp = router.route(LlmRequest::prompt("hi")).await.unwrap();
        assert_eq!(resp.content, "ok");
    }

    #[tokio::test]
    async fn test_empty_router_is_unavailable() {
        let router = LlmRouter::new(None);
        assert!(matches!(
            router.route(LlmRequest::prompt("hi")).await,
            Err(LlmError::Unavailable(_))
        ));
    }

    #[test]
    fn test_default_backend_tried_first() {
        let mut router = LlmRouter::new(Some("b".to_string()));
        router.register_backend("a", Arc::new(ScriptedBackend::always("a").with_model("model-a")));
        router.register_backend("b", Arc::new(ScriptedBackend::always("b").with_model("model-b")));
        assert_eq!(router.model_id(), "model-b");
    }

    #[test]
    fn test_build_router_skips_gemini_without_key() {
        let gemini = BackendConfig {
            name: "gemini".to_string(),
            kind: BackendKind::Gemini,
            model: "gemini-2.5-flash".to_string(),
            api_key: None,
            base_url: None,
        };
        let router = build_router(vec![gemini, mock_cfg("mock")], None);
        assert_eq!(router.backend_names(), vec!["mock"]);
    }
}
