//! Claim extraction adapter.
//!
//! Wraps the LLM collaborator. Every failure mode (timeout, transport error,
//! malformed or empty output) is recovered per chunk by heuristic
//! extraction, so `extract` never fails for non-empty text.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::future::join_all;
use iris_common::{ExtractionConfig, RawClaim};
use iris_llm::audit::LlmAuditEntry;
use iris_llm::{LlmBackend, LlmError, LlmRequest};
use tracing::{debug, warn};

use crate::chunker::{chunk_text, ChunkerConfig, TextChunk};
use crate::heuristic::heuristic_claims;
use crate::response::{parse_claims, ParseError};

/// Raw claims for one paper plus the chunks they were drawn from.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutput {
    pub claims: Vec<RawClaim>,
    /// Chunks that were sent for extraction.
    pub chunks: Vec<TextChunk>,
    /// Number of chunks recovered by heuristic extraction.
    pub fallback_chunks: usize,
}

impl ExtractionOutput {
    pub fn used_fallback(&self) -> bool {
        self.fallback_chunks > 0 || self.claims.iter().any(|c| c.used_fallback)
    }

    pub fn chunk_ids(&self) -> Vec<String> {
        self.chunks.iter().map(|c| c.chunk_id.clone()).collect()
    }
}

#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    async fn extract(&self, paper_id: &str, text: &str) -> ExtractionOutput;
}

#[derive(Debug, thiserror::Error)]
enum ChunkError {
    #[error("collaborator timed out after {0}s")]
    Timeout(u64),
    #[error("collaborator error: {0}")]
    Collaborator(#[from] LlmError),
    #[error("malformed output: {0}")]
    Malformed(#[from] ParseError),
}

fn build_prompt(chunk: &TextChunk, prompt_chars: usize) -> String {
    let excerpt: String = chunk.content.chars().take(prompt_chars).collect();
    format!(
        "You are a research claim extractor. From the excerpt below, extract the single most \
important factual or quantitative claim.\n\
Return ONLY JSON with the fields: text, confidence (0-1), methods (list), metrics (list), \
provenance (list of chunk ids).\n\
Use \"{id}\" as provenance.\n\n\
Excerpt ({id}):\n{excerpt}",
        id = chunk.chunk_id,
    )
}

// ── LLM-backed extractor ─────────────────────────────────────────────────────

pub struct LlmClaimExtractor {
    backend: Arc<dyn LlmBackend>,
    config: ExtractionConfig,
}

impl LlmClaimExtractor {
    pub fn new(backend: Arc<dyn LlmBackend>, config: ExtractionConfig) -> Self {
        Self { backend, config }
    }

    async fn extract_chunk(&self, paper_id: &str, chunk: &TextChunk) -> Result<Vec<RawClaim>, ChunkError> {
        let req = LlmRequest::prompt(build_prompt(chunk, self.config.prompt_chars))
            .with_limits(self.config.max_output_tokens, self.config.temperature);

        let started = Instant::now();
        let resp = tokio::time::timeout(self.config.call_timeout(), self.backend.complete(req))
            .await
            .map_err(|_| ChunkError::Timeout(self.config.call_timeout_secs))??;

        LlmAuditEntry::new(
            "claim_extraction",
            Some(format!("{paper_id}/{}", chunk.chunk_id)),
            &resp,
            started.elapsed().as_millis() as u64,
        )
        .log();

        let mut claims = parse_claims(&resp.content)?;
        for claim in &mut claims {
            if claim.provenance.is_empty() {
                claim.provenance.push(chunk.chunk_id.clone());
            }
        }
        Ok(claims)
    }

    fn fallback(&self, chunk: &TextChunk) -> Vec<RawClaim> {
        heuristic_claims(
            &chunk.content,
            self.config.fallback_confidence,
            self.config.max_fallback_claims,
        )
    }
}

#[async_trait]
impl ClaimExtractor for LlmClaimExtractor {
    async fn extract(&self, paper_id: &str, text: &str) -> ExtractionOutput {
        let mut chunks = chunk_text(text, &ChunkerConfig::from(&self.config));
        chunks.truncate(self.config.max_chunks);
        if chunks.is_empty() {
            return ExtractionOutput::default();
        }

        let results = join_all(chunks.iter().map(|chunk| self.extract_chunk(paper_id, chunk))).await;

        let mut output = ExtractionOutput::default();
        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(claims) => output.claims.extend(claims),
                Err(e) => {
                    warn!(paper_id, chunk_id = %chunk.chunk_id, error = %e, "Chunk extraction failed, using heuristic fallback");
                    output.fallback_chunks += 1;
                    output.claims.extend(self.fallback(chunk));
                }
            }
        }

        if output.claims.is_empty() {
            debug!(paper_id, "No claims from chunks, running heuristic over full text");
            output.claims = heuristic_claims(text, self.config.fallback_confidence, self.config.max_fallback_claims);
        }

        output.chunks = chunks;
        debug!(
            paper_id,
            chunks = output.chunks.len(),
            claims = output.claims.len(),
            fallback_chunks = output.fallback_chunks,
            "Extraction complete"
        );
        output
    }
}

// ── Heuristic-only extractor ─────────────────────────────────────────────────

/// Extractor used when no collaborator is configured.
pub struct HeuristicExtractor {
    config: ExtractionConfig,
}

impl HeuristicExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClaimExtractor for HeuristicExtractor {
    async fn extract(&self, _paper_id: &str, text: &str) -> ExtractionOutput {
        let mut chunks = chunk_text(text, &ChunkerConfig::from(&self.config));
        chunks.truncate(self.config.max_chunks);

        let claims: Vec<RawClaim> = chunks
            .iter()
            .flat_map(|chunk| {
                heuristic_claims(&chunk.content, self.config.fallback_confidence, self.config.max_fallback_claims)
            })
            .collect();

        ExtractionOutput { fallback_chunks: chunks.len(), claims, chunks }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use iris_llm::backend::ScriptedBackend;

    use super::*;

    fn extractor(backend: ScriptedBackend) -> (Arc<ScriptedBackend>, LlmClaimExtractor) {
        let backend = Arc::new(backend);
        let ex = LlmClaimExtractor::new(backend.clone(), ExtractionConfig::default());
        (backend, ex)
    }

    #[tokio::test]
    async fn test_valid_response_gets_chunk_provenance() {
        let (_, ex) = extractor(ScriptedBackend::always(
            r#"{"text": "Method X achieves 95% accuracy", "confidence": 0.9, "methods": ["X"], "metrics": ["accuracy"]}"#,
        ));
        let out = ex.extract("p1", "Method X achieves 95% accuracy on the benchmark.").await;
        assert_eq!(out.claims.len(), 1);
        assert_eq!(out.claims[0].provenance, vec!["chunk_0"]);
        assert!(!out.used_fallback());
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back() {
        let (_, ex) = extractor(ScriptedBackend::always("I cannot answer that."));
        let out = ex.extract("p1", "Model A is 10% better than model B. Nothing else.").await;
        assert!(out.used_fallback());
        assert_eq!(out.fallback_chunks, 1);
        assert_eq!(out.claims[0].text, "Model A is 10% better than model B.");
        assert_eq!(out.claims[0].confidence, Some(0.35));
        assert!(out.claims[0].provenance.is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_failure_falls_back() {
        let (backend, ex) = extractor(ScriptedBackend::failing());
        let out = ex.extract("p1", "Accuracy improved by 3 points.").await;
        assert_eq!(backend.calls(), 1);
        assert_eq!(out.claims.len(), 1);
        assert!(out.claims[0].used_fallback);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let backend = Arc::new(ScriptedBackend::always(r#"{"text": "late"}"#).with_delay(Duration::from_millis(200)));
        let config = ExtractionConfig { call_timeout_secs: 0, ..ExtractionConfig::default() };
        let ex = LlmClaimExtractor::new(backend, config);
        let out = ex.extract("p1", "Latency dropped to 12 ms.").await;
        assert_eq!(out.fallback_chunks, 1);
        assert_eq!(out.claims[0].text, "Latency dropped to 12 ms.");
    }

    #[tokio::test]
    async fn test_chunk_cap_limits_calls() {
        let (backend, _) = extractor(ScriptedBackend::always(r#"{"text": "x"}"#));
        let config = ExtractionConfig { chunk_chars: 40, overlap_chars: 0, max_chunks: 2, ..ExtractionConfig::default() };
        let ex = LlmClaimExtractor::new(backend.clone(), config);
        let text = "Sentence number one is here. ".repeat(20);
        let out = ex.extract("p1", &text).await;
        assert_eq!(backend.calls(), 2);
        assert_eq!(out.chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_text_yields_nothing() {
        let (backend, ex) = extractor(ScriptedBackend::always("{}"));
        let out = ex.extract("p1", "   ").await;
        assert!(out.claims.is_empty());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_heuristic_extractor() {
        let ex = HeuristicExtractor::new(ExtractionConfig::default());
        let out = ex.extract("p1", "We report 42% fewer errors.").await;
        assert_eq!(out.claims.len(), 1);
        assert!(out.used_fallback());
    }
}
