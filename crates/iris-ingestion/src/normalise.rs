//! Claim normalisation.
//!
//! Turns untrusted [`RawClaim`]s into [`Claim`]s: text is whitespace
//! collapsed, confidence clamped into [0, 1], provenance resolved against
//! the paper's chunk ids, duplicates merged and ids assigned. Running the
//! normaliser over its own output changes nothing.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use iris_common::confidence::{clamp_confidence, DEFAULT_CONFIDENCE};
use iris_common::{Claim, RawClaim};
use regex::Regex;
use tracing::debug;

use crate::chunker::chunk_id;
use crate::dedup::merge_duplicates;

fn trailing_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*$").expect("valid regex"))
}

#[derive(Debug, Clone)]
pub struct ClaimNormaliser {
    default_confidence: f64,
}

impl Default for ClaimNormaliser {
    fn default() -> Self {
        Self { default_confidence: DEFAULT_CONFIDENCE }
    }
}

impl ClaimNormaliser {
    pub fn new(default_confidence: f64) -> Self {
        Self { default_confidence }
    }

    /// Normalise `raw` claims for `paper_id`. `known_chunks` is the set of
    /// chunk ids the paper was split into; references outside it are dropped.
    pub fn normalise(&self, paper_id: &str, raw: Vec<RawClaim>, known_chunks: &[String]) -> Vec<Claim> {
        let candidates: Vec<Claim> = raw
            .into_iter()
            .filter_map(|rc| self.normalise_one(paper_id, rc, known_chunks))
            .collect();

        merge_duplicates(candidates)
            .into_iter()
            .enumerate()
            .map(|(i, mut claim)| {
                claim.id = format!("{paper_id}_claim_{i}");
                claim
            })
            .collect()
    }

    fn normalise_one(&self, paper_id: &str, raw: RawClaim, known_chunks: &[String]) -> Option<Claim> {
        let text = collapse_whitespace(&raw.text);
        if text.is_empty() {
            debug!(paper_id, "Dropping claim with empty text");
            return None;
        }

        let confidence = clamp_confidence(raw.confidence, self.default_confidence);
        if raw.confidence.is_some_and(|c| c != confidence) {
            debug!(paper_id, raw = ?raw.confidence, clamped = confidence, "Confidence out of range");
        }

        let mut provenance: Vec<String> = Vec::new();
        for reference in &raw.provenance {
            match resolve_chunk_ref(reference, known_chunks) {
                Some(id) if !provenance.contains(&id) => provenance.push(id),
                Some(_) => {}
                None => debug!(paper_id, reference = %reference, "Dropping unknown provenance reference"),
            }
        }

        Some(Claim {
            id: String::new(),
            text,
            confidence,
            methods: clean_labels(raw.methods),
            metrics: clean_labels(raw.metrics),
            provenance,
            used_fallback: raw.used_fallback,
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_labels(labels: Vec<String>) -> BTreeSet<String> {
    labels
        .iter()
        .map(|l| collapse_whitespace(l))
        .filter(|l| !l.is_empty())
        .collect()
}

/// Map a provenance reference to a canonical chunk id.
///
/// Accepts exact ids and loose forms such as `"Chunk 2"`, `"2"` or
/// `"chunk-2"`; the trailing number decides.
pub fn resolve_chunk_ref(reference: &str, known_chunks: &[String]) -> Option<String> {
    let reference = reference.trim();
    if known_chunks.iter().any(|k| k == reference) {
        return Some(reference.to_string());
    }
    let n: usize = trailing_number_re()
        .captures(reference)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    let candidate = chunk_id(n);
    known_chunks.contains(&candidate).then_some(candidate)
}
