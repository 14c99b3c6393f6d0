//! Configuration loading for the IRIS server.
//! Reads iris.toml from the current directory or the path in IRIS_CONFIG env var.

use std::path::Path;

use iris_common::EngineConfig;
use iris_llm::{BackendConfig, BackendKind};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LlmConfig {
    /// Answer every extraction call from the in-process echo backend.
    #[serde(default)]
    pub mock: bool,
    /// Backend tried first; the rest follow in declaration order.
    pub default_backend: Option<String>,
    pub gemini: Option<GeminiConfig>,
    pub ollama: Option<OllamaConfig>,
    pub openai_compatible: Option<OpenAiCompatibleConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    pub api_key: Option<SecretString>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_model() -> String { "gemini-2.5-flash".to_string() }

#[derive(Debug, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_ollama_model() -> String { "llama3:8b".to_string() }

#[derive(Debug, Deserialize)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<SecretString>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("IRIS_CONFIG").unwrap_or_else(|_| "iris.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.engine.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("IRIS_USE_MOCK_LLM") {
            self.llm.mock = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(port) = std::env::var("IRIS_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Backend list for the LLM router. Keys missing from the file fall back
    /// to `IRIS_GEMINI_API_KEY` and `IRIS_COMPAT_API_KEY` / `IRIS_OPENAI_API_KEY`.
    pub fn backend_configs(&self) -> Vec<BackendConfig> {
        if self.llm.mock {
            return vec![BackendConfig {
                name: "mock".to_string(),
                kind: BackendKind::Mock,
                model: "mock".to_string(),
                api_key: None,
                base_url: None,
            }];
        }

        let mut backends = Vec::new();

        if let Some(gemini) = &self.llm.gemini {
            let api_key = copy_secret(gemini.api_key.as_ref()).or_else(|| env_secret(&["IRIS_GEMINI_API_KEY"]));
            if api_key.is_none() {
                tracing::warn!("Gemini configured but no API key in iris.toml or IRIS_GEMINI_API_KEY");
            }
            backends.push(BackendConfig {
                name: "gemini".to_string(),
                kind: BackendKind::Gemini,
                model: gemini.model.clone(),
                api_key,
                base_url: None,
            });
        }

        if let Some(ollama) = &self.llm.ollama {
            backends.push(BackendConfig {
                name: "ollama".to_string(),
                kind: BackendKind::Ollama,
                model: ollama.model.clone(),
                api_key: None,
                base_url: Some(ollama.base_url.clone()),
            });
        }

        if let Some(compat) = &self.llm.openai_compatible {
            backends.push(BackendConfig {
                name: "openai_compatible".to_string(),
                kind: BackendKind::OpenAiCompatible,
                model: compat.model.clone(),
                api_key: copy_secret(compat.api_key.as_ref())
                    .or_else(|| env_secret(&["IRIS_COMPAT_API_KEY", "IRIS_OPENAI_API_KEY"])),
                base_url: Some(compat.base_url.clone()),
            });
        }

        if backends.is_empty() {
            tracing::warn!("No LLM backends configured; claim extraction will use the heuristic extractor");
        }
        backends
    }
}

fn copy_secret(secret: Option<&SecretString>) -> Option<SecretString> {
    secret
        .map(|s| s.expose_secret())
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_string()))
}

fn env_secret(names: &[&str]) -> Option<SecretString> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        .map(SecretString::from)
}

mod tests;
