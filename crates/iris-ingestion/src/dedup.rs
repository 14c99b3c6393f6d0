//! Duplicate-claim merging within a single paper.

use std::collections::HashMap;

use iris_common::Claim;

/// Key under which two claim texts count as the same assertion:
/// lowercase with whitespace runs collapsed.
pub fn dedup_key(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merge claims that share a [`dedup_key`].
///
/// The first occurrence keeps its position and text. Confidence becomes the
/// maximum, methods and metrics are unioned, and provenance is unioned in
/// first-seen order. A merged claim is a fallback claim only if all of its
/// sources were.
pub fn merge_duplicates(claims: Vec<Claim>) -> Vec<Claim> {
    let mut merged: Vec<Claim> = Vec::with_capacity(claims.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for claim in claims {
        let key = dedup_key(&claim.text);
        match index.get(&key) {
            Some(&pos) => {
                let existing = &mut merged[pos];
                existing.confidence = existing.confidence.max(claim.confidence);
                existing.methods.extend(claim.methods);
                existing.metrics.extend(claim.metrics);
                for p in claim.provenance {
                    if !existing.provenance.contains(&p) {
                        existing.provenance.push(p);
                    }
                }
                existing.used_fallback &= claim.used_fallback;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(claim);
            }
        }
    }

    merged
}
