//! Consensus grouping.
//!
//! Claims from different papers whose similarity reaches the threshold are
//! joined by an edge, unless the pair conflicts. Connected components that
//! span at least two papers become [`ConsensusGroup`]s.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use iris_common::confidence::mean;
use iris_common::{ClaimRef, ThresholdConfig};
use serde::{Deserialize, Serialize};

use crate::conflict::classify_conflict;
use crate::similarity::{claim_similarity, ProfiledClaim};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusGroup {
    /// Text of the highest-confidence member.
    pub text: String,
    /// Ordered by paper id, then claim position.
    pub member_claims: Vec<ClaimRef>,
    pub average_confidence: f64,
}

impl ConsensusGroup {
    pub fn paper_ids(&self) -> BTreeSet<&str> {
        self.member_claims.iter().map(|m| m.paper_id.as_str()).collect()
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index wins so roots are deterministic.
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent[hi] = lo;
        }
    }
}

/// Group claims asserting the same fact across papers. `claims` must be
/// ordered by paper id then claim position; groups come back ordered by
/// their first member.
pub fn group_consensus(claims: &[ProfiledClaim<'_>], t: &ThresholdConfig) -> Vec<ConsensusGroup> {
    let mut uf = UnionFind::new(claims.len());

    for i in 0..claims.len() {
        for j in (i + 1)..claims.len() {
            let (a, b) = (&claims[i], &claims[j]);
            if a.paper_id == b.paper_id {
                continue;
            }
            let sim = claim_similarity(&a.profile, &b.profile, t.method_boost);
            if sim >= t.similarity_threshold && classify_conflict(&a.profile, &b.profile, t).is_none() {
                uf.union(i, j);
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..claims.len() {
        let root = uf.find(i);
        components.entry(root).or_default().push(i);
    }

    components
        .into_values()
        .filter(|members| {
            members.iter().map(|&i| claims[i].paper_id).collect::<BTreeSet<_>>().len() >= 2
        })
        .map(|members| build_group(claims, &members))
        .collect()
}

fn build_group(claims: &[ProfiledClaim<'_>], members: &[usize]) -> ConsensusGroup {
    // Members are already in (paper id, position) order, so the first
    // maximum wins ties.
    let mut representative = members[0];
    for &i in members {
        if claims[i].claim.confidence > claims[representative].claim.confidence {
            representative = i;
        }
    }

    let confidences: Vec<f64> = members.iter().map(|&i| claims[i].claim.confidence).collect();

    ConsensusGroup {
        text: claims[representative].claim.text.clone(),
        member_claims: members.iter().map(|&i| claims[i].claim_ref()).collect(),
        average_confidence: mean(&confidences),
    }
}

/// Map every grouped claim to the index of its group.
pub fn membership(groups: &[ConsensusGroup]) -> HashMap<ClaimRef, usize> {
    groups
        .iter()
        .enumerate()
        .flat_map(|(g, group)| group.member_claims.iter().map(move |m| (m.clone(), g)))
        .collect()
}
