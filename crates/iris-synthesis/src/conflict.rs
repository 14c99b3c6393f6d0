//! Contradiction detection between claims of different papers.
//!
//! Candidates share at least one method or metric. A candidate pair
//! conflicts when it talks about the same thing and asserts a different
//! outcome: opposite direction words, one side negated, or stated numbers
//! that diverge beyond the tolerance.

use std::collections::{BTreeSet, HashMap};

use iris_common::confidence::contradictory_confidence;
use iris_common::{ClaimRef, ThresholdConfig};
use serde::{Deserialize, Serialize};

use crate::similarity::{topic_overlap, ClaimProfile, ProfiledClaim};

/// Classification of a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Opposite directionality (e.g. increases vs decreases).
    Directional,
    /// Same quantity, values beyond the tolerance.
    Magnitude,
    /// One claim asserts what the other denies.
    Negation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    Unresolved,
    ManualReview,
}

/// A contradictory pair. `paper_a` always sorts before `paper_b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    pub paper_a: String,
    pub claim_a: String,
    pub text_a: String,
    pub paper_b: String,
    pub claim_b: String,
    pub text_b: String,
    pub kind: ConflictType,
    pub net_confidence: f64,
    pub resolution: ConflictResolution,
}

/// Whether two stated quantity lists disagree. Lists must line up in
/// length and unit; any pair differing by more than `tolerance` relative to
/// the larger value counts.
fn quantities_diverge(a: &ClaimProfile, b: &ClaimProfile, tolerance: f64) -> bool {
    if a.quantities.is_empty() || a.quantities.len() != b.quantities.len() {
        return false;
    }
    if a.quantities.iter().zip(&b.quantities).any(|(x, y)| x.percent != y.percent) {
        return false;
    }
    a.quantities.iter().zip(&b.quantities).any(|(x, y)| {
        let scale = x.value.abs().max(y.value.abs());
        scale > 0.0 && (x.value - y.value).abs() / scale > tolerance
    })
}

/// Classify a pair of claim profiles, `None` when they do not conflict.
pub fn classify_conflict(a: &ClaimProfile, b: &ClaimProfile, t: &ThresholdConfig) -> Option<ConflictType> {
    let topic = topic_overlap(a, b);

    if a.opposes(b) && topic >= t.direction_topic_threshold {
        Some(ConflictType::Directional)
    } else if topic >= t.topic_threshold && a.negated != b.negated {
        Some(ConflictType::Negation)
    } else if topic >= t.topic_threshold && quantities_diverge(a, b, t.quantitative_tolerance) {
        Some(ConflictType::Magnitude)
    } else {
        None
    }
}

/// Build the contradiction record for an ordered pair.
pub fn evaluate_conflict(a: &ProfiledClaim<'_>, b: &ProfiledClaim<'_>, t: &ThresholdConfig) -> Option<Contradiction> {
    let kind = classify_conflict(&a.profile, &b.profile, t)?;
    let (ca, cb) = (a.claim.confidence, b.claim.confidence);

    let net_confidence = contradictory_confidence(&[ca, -cb]);
    let resolution = if ca > 0.70 && cb > 0.70 {
        ConflictResolution::ManualReview
    } else {
        ConflictResolution::Unresolved
    };

    Some(Contradiction {
        paper_a: a.paper_id.to_string(),
        claim_a: a.claim.id.clone(),
        text_a: a.claim.text.clone(),
        paper_b: b.paper_id.to_string(),
        claim_b: b.claim.id.clone(),
        text_b: b.claim.text.clone(),
        kind,
        net_confidence,
        resolution,
    })
}

/// Index pairs `(i, j)`, `i < j`, of claims from different papers that share
/// a method or a metric.
fn candidate_pairs(claims: &[ProfiledClaim<'_>]) -> BTreeSet<(usize, usize)> {
    let mut index: HashMap<(u8, &str), Vec<usize>> = HashMap::new();
    for (i, c) in claims.iter().enumerate() {
        for m in &c.profile.methods {
            index.entry((0, m.as_str())).or_default().push(i);
        }
        for m in &c.profile.metrics {
            index.entry((1, m.as_str())).or_default().push(i);
        }
    }

    let mut pairs = BTreeSet::new();
    for members in index.values() {
        for (k, &i) in members.iter().enumerate() {
            for &j in &members[k + 1..] {
                if i != j && claims[i].paper_id != claims[j].paper_id {
                    pairs.insert((i.min(j), i.max(j)));
                }
            }
        }
    }
    pairs
}

/// Detect contradictions. `claims` must be ordered by paper id then claim
/// position; `group_of` maps claims to their consensus group, and pairs in
/// the same group are never reported.
pub fn detect_contradictions(
    claims: &[ProfiledClaim<'_>],
    group_of: &HashMap<ClaimRef, usize>,
    t: &ThresholdConfig,
) -> Vec<Contradiction> {
    candidate_pairs(claims)
        .into_iter()
        .filter(|&(i, j)| {
            let (gi, gj) = (group_of.get(&claims[i].claim_ref()), group_of.get(&claims[j].claim_ref()));
            !matches!((gi, gj), (Some(x), Some(y)) if x == y)
        })
        .filter_map(|(i, j)| evaluate_conflict(&claims[i], &claims[j], t))
        .collect()
}

#[cfg(test)]
mod tests {
    use iris_common::Paper;

    use super::*;
    use crate::similarity::profile_papers;
    use crate::similarity::tests::claim;

    fn paper(id: &str, claims: Vec<iris_common::Claim>) -> Paper {
        Paper::new(id, None, "text").with_analysis(claims, 1)
    }

    fn profile(text: &str) -> ClaimProfile {
        ClaimProfile::new(&claim("c", text, 0.8, &["X"]))
    }

    #[test]
    fn test_no_conflict_for_similar_evidence() {
        let t = ThresholdConfig::default();
        let a = profile("Method X achieves 95% accuracy");
        let b = profile("Method X achieves 94% accuracy");
        assert_eq!(classify_conflict(&a, &b, &t), None);
    }

    #[test]
    fn test_magnitude_conflict() {
        let t = ThresholdConfig::default();
        let a = profile("batch size 32 improves convergence");
        let b = profile("batch size 64 improves convergence");
        assert_eq!(classify_conflict(&a, &b, &t), Some(ConflictType::Magnitude));
    }

    #[test]
    fn test_dataset_names_are_not_magnitudes() {
        let t = ThresholdConfig::default();
        let a = profile("Method X improves accuracy by 3% on CIFAR10");
        let b = profile("Method X improves accuracy by 3% on CIFAR100");
        assert_eq!(classify_conflict(&a, &b, &t), None);

        let a = profile("Method X improves top-1 accuracy by 3%");
        let b = profile("Method X improves top-5 accuracy by 3%");
        assert_eq!(classify_conflict(&a, &b, &t), None);
    }

    #[test]
    fn test_units_must_match() {
        let t = ThresholdConfig::default();
        let a = profile("Model X latency is 40% of baseline");
        let b = profile("Model X latency is 80 of baseline");
        assert_eq!(classify_conflict(&a, &b, &t), None);
    }

    #[test]
    fn test_directional_and_negation_conflicts() {
        let t = ThresholdConfig::default();
        assert_eq!(
            classify_conflict(
                &profile("Pretraining increases downstream accuracy"),
                &profile("Pretraining decreases downstream accuracy"),
                &t
            ),
            Some(ConflictType::Directional)
        );
        assert_eq!(
            classify_conflict(
                &profile("Data augmentation helps generalization"),
                &profile("Data augmentation does not help generalization"),
                &t
            ),
            Some(ConflictType::Negation)
        );
    }

    #[test]
    fn test_detects_canonically_ordered_pair_once() {
        let t = ThresholdConfig::default();
        let papers = vec![
            paper("p2", vec![claim("p2_claim_0", "batch size 64 improves convergence", 0.9, &["X"])]),
            paper("p1", vec![claim("p1_claim_0", "batch size 32 improves convergence", 0.8, &["X"])]),
        ];
        let profiled = profile_papers(&papers);
        let found = detect_contradictions(&profiled, &HashMap::new(), &t);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].paper_a, "p1");
        assert_eq!(found[0].paper_b, "p2");
        assert_eq!(found[0].kind, ConflictType::Magnitude);
        assert_eq!(found[0].resolution, ConflictResolution::ManualReview);
    }

    #[test]
    fn test_requires_shared_label() {
        let t = ThresholdConfig::default();
        let papers = vec![
            paper("p1", vec![claim("p1_claim_0", "batch size 32 improves convergence", 0.8, &["X"])]),
            paper("p2", vec![claim("p2_claim_0", "batch size 64 improves convergence", 0.8, &["Y"])]),
        ];
        let profiled = profile_papers(&papers);
        assert!(detect_contradictions(&profiled, &HashMap::new(), &t).is_empty());
    }

    #[test]
    fn test_same_group_pairs_are_skipped() {
        let t = ThresholdConfig::default();
        let papers = vec![
            paper("p1", vec![claim("p1_claim_0", "batch size 32 improves convergence", 0.8, &["X"])]),
            paper("p2", vec![claim("p2_claim_0", "batch size 64 improves convergence", 0.8, &["X"])]),
        ];
        let profiled = profile_papers(&papers);
        let group_of = HashMap::from([
            (ClaimRef::new("p1", "p1_claim_0"), 0),
            (ClaimRef::new("p2", "p2_claim_0"), 0),
        ]);
        assert!(detect_contradictions(&profiled, &group_of, &t).is_empty());
    }

    #[test]
    fn test_net_confidence_penalised() {
        let t = ThresholdConfig::default();
        let papers = vec![
            paper("p1", vec![claim("a", "Pretraining increases accuracy", 0.9, &["X"])]),
            paper("p2", vec![claim("b", "Pretraining decreases accuracy", 0.5, &["X"])]),
        ];
        let profiled = profile_papers(&papers);
        let c = evaluate_conflict(&profiled[0], &profiled[1], &t).unwrap();
        assert!((c.net_confidence - 0.28).abs() < 1e-9);
        assert_eq!(c.resolution, ConflictResolution::Unresolved);
    }
}
