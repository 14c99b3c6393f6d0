//! Claim and paper data model shared by extraction, synthesis and the web API.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate claim as produced by the extraction step, before normalisation.
///
/// Every field is optional or defaulted because the collaborator output is
/// untrusted; the normaliser turns this into a [`Claim`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawClaim {
    pub text: String,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub provenance: Vec<String>,
    #[serde(default)]
    pub used_fallback: bool,
}

/// A normalised claim. Immutable once attached to a [`Paper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    /// Always within [0.0, 1.0].
    pub confidence: f64,
    pub methods: BTreeSet<String>,
    pub metrics: BTreeSet<String>,
    /// Canonical chunk ids, first-seen order.
    pub provenance: Vec<String>,
    #[serde(default)]
    pub used_fallback: bool,
}

impl Claim {
    pub fn has_provenance(&self) -> bool {
        !self.provenance.is_empty()
    }
}

impl From<&Claim> for RawClaim {
    fn from(claim: &Claim) -> Self {
        RawClaim {
            text: claim.text.clone(),
            confidence: Some(claim.confidence),
            methods: claim.methods.iter().cloned().collect(),
            metrics: claim.metrics.iter().cloned().collect(),
            provenance: claim.provenance.clone(),
            used_fallback: claim.used_fallback,
        }
    }
}

/// (paper_id, claim_id) reference to a claim within a session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimRef {
    pub paper_id: String,
    pub claim_id: String,
}

impl ClaimRef {
    pub fn new(paper_id: impl Into<String>, claim_id: impl Into<String>) -> Self {
        Self { paper_id: paper_id.into(), claim_id: claim_id.into() }
    }
}

/// A paper registered in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: Option<String>,
    /// Plain text handed over by the ingestion collaborator.
    pub text: String,
    /// `None` until the paper has been analyzed.
    pub claims: Option<Vec<Claim>>,
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub num_chunks_analyzed: usize,
    #[serde(default)]
    pub used_fallback: bool,
    pub added_at: DateTime<Utc>,
}

impl Paper {
    pub fn new(id: impl Into<String>, title: Option<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title,
            text: text.into(),
            claims: None,
            analyzed_at: None,
            num_chunks_analyzed: 0,
            used_fallback: false,
            added_at: Utc::now(),
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.claims.is_some()
    }

    /// Claims of an analyzed paper, or an empty slice.
    pub fn claims(&self) -> &[Claim] {
        self.claims.as_deref().unwrap_or(&[])
    }

    /// Return a copy of this paper with its claim set replaced wholesale.
    pub fn with_analysis(&self, claims: Vec<Claim>, num_chunks_analyzed: usize) -> Self {
        let used_fallback = claims.iter().any(|c| c.used_fallback);
        Self {
            claims: Some(claims),
            analyzed_at: Some(Utc::now()),
            num_chunks_analyzed,
            used_fallback,
            ..self.clone()
        }
    }
}
