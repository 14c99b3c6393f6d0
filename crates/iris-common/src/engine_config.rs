//! Engine configuration: synthesis thresholds, extraction limits and job timeouts.
//!
//! Every field has a serde default so a partial `[engine]` table in
//! `iris.toml` is enough. The numeric thresholds are calibration knobs,
//! not load-bearing constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::confidence::DEFAULT_CONFIDENCE;
use crate::error::{IrisError, Result};

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub jobs: JobConfig,
}

// ── Thresholds ────────────────────────────────────────────────────────────────

/// Similarity, conflict and hallucination thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum similarity for two claims to count as the same assertion.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Maximum boost added for overlapping method sets.
    #[serde(default = "default_method_boost")]
    pub method_boost: f64,

    /// Minimum topic overlap before numbers or negation are compared.
    #[serde(default = "default_topic_threshold")]
    pub topic_threshold: f64,

    /// Minimum topic overlap for opposite-direction language to count.
    #[serde(default = "default_direction_topic_threshold")]
    pub direction_topic_threshold: f64,

    /// Relative difference above which two quantities diverge.
    #[serde(default = "default_quantitative_tolerance")]
    pub quantitative_tolerance: f64,

    /// Claims below this confidence with no provenance are flagged.
    #[serde(default = "default_hallucination_threshold")]
    pub hallucination_confidence_threshold: f64,

    /// Confidence assigned when the extractor gave none.
    #[serde(default = "default_confidence")]
    pub default_confidence: f64,
}

fn default_similarity_threshold() -> f64 { 0.75 }
fn default_method_boost() -> f64 { 0.10 }
fn default_topic_threshold() -> f64 { 0.5 }
fn default_direction_topic_threshold() -> f64 { 0.3 }
fn default_quantitative_tolerance() -> f64 { 0.05 }
fn default_hallucination_threshold() -> f64 { 0.5 }
fn default_confidence() -> f64 { DEFAULT_CONFIDENCE }

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            method_boost: default_method_boost(),
            topic_threshold: default_topic_threshold(),
            direction_topic_threshold: default_direction_topic_threshold(),
            quantitative_tolerance: default_quantitative_tolerance(),
            hallucination_confidence_threshold: default_hallucination_threshold(),
            default_confidence: default_confidence(),
        }
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// Chunking and collaborator-call limits for claim extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,

    /// Chunks beyond this many are not sent to the collaborator.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Characters of each chunk included in the prompt.
    #[serde(default = "default_prompt_chars")]
    pub prompt_chars: usize,

    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Confidence given to heuristic fallback claims.
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,

    /// Upper bound on fallback claims taken from one chunk.
    #[serde(default = "default_max_fallback_claims")]
    pub max_fallback_claims: usize,
}

fn default_chunk_chars() -> usize { 1500 }
fn default_overlap_chars() -> usize { 200 }
fn default_max_chunks() -> usize { 6 }
fn default_prompt_chars() -> usize { 1200 }
fn default_call_timeout() -> u64 { 30 }
fn default_max_output_tokens() -> u32 { 280 }
fn default_temperature() -> f32 { 0.15 }
fn default_fallback_confidence() -> f64 { 0.35 }
fn default_max_fallback_claims() -> usize { 3 }

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_chars: default_chunk_chars(),
            overlap_chars: default_overlap_chars(),
            max_chunks: default_max_chunks(),
            prompt_chars: default_prompt_chars(),
            call_timeout_secs: default_call_timeout(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            fallback_confidence: default_fallback_confidence(),
            max_fallback_claims: default_max_fallback_claims(),
        }
    }
}

impl ExtractionConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

// ── Jobs ──────────────────────────────────────────────────────────────────────

/// Background job limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Whole-request deadline for one analysis or synthesis unit of work.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Capacity of the job event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Finished jobs older than this are dropped from the registry.
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    /// Upper bound on tracked jobs; the oldest finished ones go first.
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,
}

fn default_request_timeout() -> u64 { 120 }
fn default_event_capacity() -> usize { 256 }
fn default_retention() -> u64 { 3600 }
fn default_max_retained() -> usize { 1024 }

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            event_capacity: default_event_capacity(),
            retention_secs: default_retention(),
            max_retained: default_max_retained(),
        }
    }
}

impl JobConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

// ── Loading / validation ──────────────────────────────────────────────────────

impl EngineConfig {
    /// Parse from a TOML document and validate.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| IrisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every threshold lies in [0, 1] and limits are non-zero.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        let unit = [
            ("similarity_threshold", t.similarity_threshold),
            ("method_boost", t.method_boost),
            ("topic_threshold", t.topic_threshold),
            ("direction_topic_threshold", t.direction_topic_threshold),
            ("quantitative_tolerance", t.quantitative_tolerance),
            ("hallucination_confidence_threshold", t.hallucination_confidence_threshold),
            ("default_confidence", t.default_confidence),
            ("fallback_confidence", self.extraction.fallback_confidence),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(IrisError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }

        let e = &self.extraction;
        if e.chunk_chars == 0 || e.max_chunks == 0 {
            return Err(IrisError::Config("chunk_chars and max_chunks must be positive".into()));
        }
        if e.overlap_chars >= e.chunk_chars {
            return Err(IrisError::Config(format!(
                "overlap_chars ({}) must be smaller than chunk_chars ({})",
                e.overlap_chars, e.chunk_chars
            )));
        }
        if self.jobs.max_retained == 0 {
            return Err(IrisError::Config("jobs.max_retained must be positive".into()));
        }
        Ok(())
    }
}
