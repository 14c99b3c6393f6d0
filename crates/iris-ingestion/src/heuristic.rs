//! Heuristic claim extraction used when the collaborator is unavailable or
//! returns nothing usable.
//!
//! Sentences containing numbers or comparative language are the most likely
//! to carry a finding, so those are preferred. Fallback claims have a fixed
//! low confidence and no methods, metrics or provenance.

use std::sync::OnceLock;

use iris_common::RawClaim;
use regex::Regex;

fn comparison_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(outperform\w*|better|worse|improv\w*|higher|lower|increas\w*|decreas\w*|reduc\w*|compared|than|versus|vs|exceed\w*|surpass\w*|significant\w*|achiev\w*)\b",
        )
        .expect("valid regex")
    })
}

/// Split text into sentences on `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next.is_whitespace() {
                    let end = i + c.len_utf8();
                    let sentence = text[start..end].trim();
                    if !sentence.is_empty() {
                        sentences.push(sentence);
                    }
                    start = end;
                }
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn looks_like_finding(sentence: &str) -> bool {
    sentence.chars().any(|c| c.is_ascii_digit()) || comparison_re().is_match(sentence)
}

/// Extract up to `max_claims` fallback claims from `text`.
///
/// Returns an empty list only when `text` is empty or whitespace.
pub fn heuristic_claims(text: &str, confidence: f64, max_claims: usize) -> Vec<RawClaim> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut picked: Vec<&str> = sentences
        .iter()
        .copied()
        .filter(|s| looks_like_finding(s))
        .take(max_claims.max(1))
        .collect();

    if picked.is_empty() {
        let first = sentences
            .iter()
            .copied()
            .find(|s| s.chars().count() > 30)
            .unwrap_or(sentences[0]);
        picked.push(first);
    }

    picked
        .into_iter()
        .map(|sentence| RawClaim {
            text: sentence.to_string(),
            confidence: Some(confidence),
            methods: Vec::new(),
            metrics: Vec::new(),
            provenance: Vec::new(),
            used_fallback: true,
        })
        .collect()
}
