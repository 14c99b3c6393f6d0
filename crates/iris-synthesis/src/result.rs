//! Synthesis result assembly.

use chrono::{DateTime, Utc};
use iris_common::{Paper, ThresholdConfig};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::conflict::{detect_contradictions, Contradiction};
use crate::consensus::{group_consensus, membership, ConsensusGroup};
use crate::similarity::profile_papers;

/// Full cross-paper analysis of one set of papers. Always recomputed from
/// scratch, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub num_papers: usize,
    pub paper_ids: Vec<String>,
    pub consensus: Vec<ConsensusGroup>,
    pub contradictions: Vec<Contradiction>,
    /// SHA-256 over the sorted paper ids and their claims.
    pub input_digest: String,
    pub created_at: DateTime<Utc>,
}

impl SynthesisResult {
    pub fn num_consensus(&self) -> usize {
        self.consensus.len()
    }

    pub fn num_contradictions(&self) -> usize {
        self.contradictions.len()
    }
}

/// Digest identifying a synthesis input.
pub fn input_digest(papers: &[Paper]) -> String {
    let mut ordered: Vec<&Paper> = papers.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for paper in ordered {
        hasher.update(paper.id.as_bytes());
        hasher.update([0u8]);
        for claim in paper.claims() {
            hasher.update(claim.id.as_bytes());
            hasher.update([0x1f]);
            hasher.update(claim.text.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

/// Run consensus grouping and contradiction detection over `papers`.
pub fn synthesize_papers(papers: &[Paper], thresholds: &ThresholdConfig) -> SynthesisResult {
    let profiled = profile_papers(papers);
    let consensus = group_consensus(&profiled, thresholds);
    let contradictions = detect_contradictions(&profiled, &membership(&consensus), thresholds);

    let mut paper_ids: Vec<String> = papers.iter().map(|p| p.id.clone()).collect();
    paper_ids.sort();

    SynthesisResult {
        num_papers: papers.len(),
        paper_ids,
        consensus,
        contradictions,
        input_digest: input_digest(papers),
        created_at: Utc::now(),
    }
}
