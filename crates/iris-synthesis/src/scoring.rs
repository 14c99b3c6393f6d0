//! Quality and hallucination-risk scoring.
//!
//! Per-paper metrics are computed from normalised claims; the summary is an
//! unweighted mean over analyzed papers, taken before rounding. All ratios
//! are rounded to four decimals in the report.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use iris_common::confidence::{mean, round4};
use iris_common::Paper;
use serde::{Deserialize, Serialize};

use crate::result::SynthesisResult;

const STATEMENT_PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperEvaluation {
    pub paper_id: String,
    pub total_claims: usize,
    pub claims_with_provenance: usize,
    pub provenance_coverage: f64,
    pub avg_claim_confidence: f64,
    pub hallucinated_claims: usize,
    /// Ids of the claims counted in `hallucinated_claims`.
    pub flagged_claims: Vec<String>,
    pub method_count: usize,
    pub metrics_count: usize,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total_papers: usize,
    pub total_claims: usize,
    pub avg_provenance_coverage: f64,
    pub avg_claim_confidence: f64,
    pub total_hallucinated_claims: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusCheck {
    pub statement: String,
    pub supporting_count: usize,
    /// A group is valid when backed by at least two papers.
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusCoverage {
    pub statement: String,
    pub num_contributing_papers: usize,
    pub pct_of_total_papers: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisEvaluation {
    pub num_consensus: usize,
    pub num_contradictions: usize,
    pub consensus_checks: Vec<ConsensusCheck>,
    pub coverage_per_consensus: Vec<ConsensusCoverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub session_id: String,
    pub analyses: Vec<PaperEvaluation>,
    pub summary: EvaluationSummary,
    /// Present once the session has a synthesis result.
    pub synthesis: Option<SynthesisEvaluation>,
    pub generated_at: DateTime<Utc>,
}

impl EvaluationReport {
    /// Report with no papers, returned alongside `NoData`.
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            analyses: Vec::new(),
            summary: EvaluationSummary::default(),
            synthesis: None,
            generated_at: Utc::now(),
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(STATEMENT_PREVIEW_CHARS).collect()
}

/// Whether a claim looks unsupported: low confidence and nothing to trace
/// it back to.
pub fn is_hallucinated(confidence: f64, has_provenance: bool, threshold: f64) -> bool {
    confidence < threshold && !has_provenance
}

/// Unrounded provenance coverage and mean confidence of a paper's claims.
fn paper_ratios(paper: &Paper) -> (f64, f64) {
    let claims = paper.claims();
    if claims.is_empty() {
        return (0.0, 0.0);
    }
    let with_prov = claims.iter().filter(|c| c.has_provenance()).count();
    let confidences: Vec<f64> = claims.iter().map(|c| c.confidence).collect();
    (with_prov as f64 / claims.len() as f64, mean(&confidences))
}

pub fn evaluate_paper(paper: &Paper, hallucination_threshold: f64) -> PaperEvaluation {
    let claims = paper.claims();
    let total = claims.len();
    let with_prov = claims.iter().filter(|c| c.has_provenance()).count();

    let flagged: Vec<String> = claims
        .iter()
        .filter(|c| is_hallucinated(c.confidence, c.has_provenance(), hallucination_threshold))
        .map(|c| c.id.clone())
        .collect();

    let methods: BTreeSet<&str> = claims.iter().flat_map(|c| c.methods.iter().map(String::as_str)).collect();
    let metrics: BTreeSet<&str> = claims.iter().flat_map(|c| c.metrics.iter().map(String::as_str)).collect();

    let (coverage, confidence) = paper_ratios(paper);

    PaperEvaluation {
        paper_id: paper.id.clone(),
        total_claims: total,
        claims_with_provenance: with_prov,
        provenance_coverage: round4(coverage),
        avg_claim_confidence: round4(confidence),
        hallucinated_claims: flagged.len(),
        flagged_claims: flagged,
        method_count: methods.len(),
        metrics_count: metrics.len(),
        used_fallback: paper.used_fallback,
    }
}

/// Session-level summary over analyzed papers. Averages use the unrounded
/// per-paper ratios and are rounded once.
pub fn summarize(papers: &[&Paper], hallucination_threshold: f64) -> EvaluationSummary {
    let (coverages, confidences): (Vec<f64>, Vec<f64>) = papers.iter().copied().map(paper_ratios).unzip();

    EvaluationSummary {
        total_papers: papers.len(),
        total_claims: papers.iter().map(|p| p.claims().len()).sum(),
        avg_provenance_coverage: round4(mean(&coverages)),
        avg_claim_confidence: round4(mean(&confidences)),
        total_hallucinated_claims: papers
            .iter()
            .copied()
            .flat_map(Paper::claims)
            .filter(|c| is_hallucinated(c.confidence, c.has_provenance(), hallucination_threshold))
            .count(),
    }
}

pub fn evaluate_synthesis(result: &SynthesisResult) -> SynthesisEvaluation {
    let total_papers = result.num_papers;

    let consensus_checks = result
        .consensus
        .iter()
        .map(|g| ConsensusCheck {
            statement: preview(&g.text),
            supporting_count: g.member_claims.len(),
            valid: g.paper_ids().len() >= 2,
        })
        .collect();

    let coverage_per_consensus = result
        .consensus
        .iter()
        .map(|g| {
            let n = g.paper_ids().len();
            ConsensusCoverage {
                statement: preview(&g.text),
                num_contributing_papers: n,
                pct_of_total_papers: if total_papers == 0 { 0.0 } else { round4(n as f64 / total_papers as f64) },
            }
        })
        .collect();

    SynthesisEvaluation {
        num_consensus: result.num_consensus(),
        num_contradictions: result.num_contradictions(),
        consensus_checks,
        coverage_per_consensus,
    }
}

/// Build the evaluation report for the analyzed papers of a session.
pub fn build_report(
    session_id: &str,
    papers: &[Paper],
    synthesis: Option<&SynthesisResult>,
    hallucination_threshold: f64,
) -> EvaluationReport {
    let mut analyzed: Vec<&Paper> = papers.iter().filter(|p| p.is_analyzed()).collect();
    analyzed.sort_by(|a, b| a.id.cmp(&b.id));

    let analyses: Vec<PaperEvaluation> = analyzed
        .iter()
        .map(|p| evaluate_paper(p, hallucination_threshold))
        .collect();

    EvaluationReport {
        session_id: session_id.to_string(),
        summary: summarize(&analyzed, hallucination_threshold),
        analyses,
        synthesis: synthesis.map(evaluate_synthesis),
        generated_at: Utc::now(),
    }
}
