//! Lexical claim profiles and pairwise similarity.
//!
//! A claim is reduced to a [`ClaimProfile`]: stemmed content tokens with
//! numbers, stopwords and negations removed, the quantities it states, its
//! negation flag and the direction words it uses. Consensus and conflict
//! detection work purely on profiles, so both are deterministic.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use iris_common::{Claim, ClaimRef, Paper};
use regex::Regex;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "these", "those", "its", "from", "are",
    "was", "were", "been", "being", "has", "have", "had", "our", "their", "which", "when",
    "into", "onto", "over", "under", "than", "then", "also", "both", "each", "all", "any",
    "can", "may", "more", "most", "such", "very", "via", "while", "use", "using", "used",
];

const NEGATIONS: &[&str] = &[
    "not", "no", "none", "never", "without", "lack", "lacks", "fails", "failed", "fail", "cannot",
];

/// Word pairs that assert opposite directions of an outcome.
const POLARITY_PAIRS: &[(&str, &str)] = &[
    ("increase", "decrease"),
    ("improve", "worse"),
    ("higher", "lower"),
    ("positive", "negative"),
    ("gain", "loss"),
    ("better", "worse"),
];

fn quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d+(?:\.\d+)?)\b\s*(%|percent\b)?").expect("valid regex"))
}

/// A word mixing letters and digits names something (CIFAR10, top-1) rather
/// than stating a value.
fn is_identifier(word: &str) -> bool {
    word.chars().any(|c| c.is_ascii_digit()) && word.chars().any(char::is_alphabetic)
}

/// Whether the number starting at `start` is the tail of a hyphenated
/// identifier such as "gpt-4".
fn is_identifier_suffix(text: &str, start: usize) -> bool {
    let mut before = text[..start].chars().rev();
    before.next() == Some('-') && before.next().is_some_and(|c| c.is_alphanumeric())
}

fn stemmed_polarity_pairs() -> &'static [(String, String)] {
    static PAIRS: OnceLock<Vec<(String, String)>> = OnceLock::new();
    PAIRS.get_or_init(|| POLARITY_PAIRS.iter().map(|(a, b)| (stem(a), stem(b))).collect())
}

/// Crude suffix stemmer; enough to line up "improves", "improved" and
/// "improve".
pub fn stem(word: &str) -> String {
    let mut w = word.to_string();
    if w.len() > 5 && w.ends_with("ing") {
        w.truncate(w.len() - 3);
    } else if w.len() > 4 && (w.ends_with("ed") || w.ends_with("es")) {
        w.truncate(w.len() - 2);
    } else if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") {
        w.truncate(w.len() - 1);
    }
    if w.len() > 4 && w.ends_with('e') {
        w.truncate(w.len() - 1);
    }
    w
}

/// A number stated in a claim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub percent: bool,
}

/// Direction asserted by a claim for one polarity pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ClaimProfile {
    pub tokens: BTreeSet<String>,
    /// Tokens minus direction words: what the claim is about.
    pub topic: BTreeSet<String>,
    pub canonical: String,
    pub quantities: Vec<Quantity>,
    pub negated: bool,
    /// (polarity pair index, direction) for every unambiguous pair.
    pub directions: Vec<(usize, Direction)>,
    pub methods: BTreeSet<String>,
    pub metrics: BTreeSet<String>,
}

impl ClaimProfile {
    pub fn new(claim: &Claim) -> Self {
        let lower = claim.text.to_lowercase().replace("n't", " not");

        let mut tokens = BTreeSet::new();
        let mut negated = false;
        for word in lower.split(|c: char| !c.is_alphanumeric() && c != '-') {
            let word = word.trim_matches('-');
            if is_identifier(word) {
                tokens.insert(word.to_string());
                continue;
            }
            for raw in word.split('-') {
                if raw.is_empty() || raw.chars().any(|c| c.is_ascii_digit()) {
                    continue;
                }
                if NEGATIONS.contains(&raw) {
                    negated = true;
                    continue;
                }
                if raw.chars().count() <= 2 || STOPWORDS.contains(&raw) {
                    continue;
                }
                tokens.insert(stem(raw));
            }
        }

        let mut directions = Vec::new();
        let mut direction_words = BTreeSet::new();
        for (i, (up, down)) in stemmed_polarity_pairs().iter().enumerate() {
            match (tokens.contains(up), tokens.contains(down)) {
                (true, false) => directions.push((i, Direction::Up)),
                (false, true) => directions.push((i, Direction::Down)),
                _ => {}
            }
            direction_words.insert(up.clone());
            direction_words.insert(down.clone());
        }
        let topic = tokens.difference(&direction_words).cloned().collect();

        let quantities = quantity_re()
            .captures_iter(&lower)
            .filter_map(|cap| {
                let number = cap.get(1)?;
                if is_identifier_suffix(&lower, number.start()) {
                    return None;
                }
                let value = number.as_str().parse().ok()?;
                Some(Quantity { value, percent: cap.get(2).is_some() })
            })
            .collect();

        let labels = |set: &BTreeSet<String>| -> BTreeSet<String> {
            set.iter().map(|s| s.to_lowercase()).collect()
        };

        Self {
            canonical: tokens.iter().cloned().collect::<Vec<_>>().join(" "),
            tokens,
            topic,
            quantities,
            negated,
            directions,
            methods: labels(&claim.methods),
            metrics: labels(&claim.metrics),
        }
    }

    /// Whether the two claims share at least one method or metric.
    pub fn shares_label(&self, other: &ClaimProfile) -> bool {
        !self.methods.is_disjoint(&other.methods) || !self.metrics.is_disjoint(&other.metrics)
    }

    /// Whether the claims assert opposite directions for the same pair.
    pub fn opposes(&self, other: &ClaimProfile) -> bool {
        self.directions.iter().any(|(i, d)| {
            other.directions.iter().any(|(j, e)| i == j && d != e)
        })
    }
}

/// Jaccard index of two sets; 0.0 when both are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Text similarity in [0, 1]: token overlap blended with edit distance over
/// the canonical token string.
pub fn text_similarity(a: &ClaimProfile, b: &ClaimProfile) -> f64 {
    if a.tokens.is_empty() || b.tokens.is_empty() {
        return 0.0;
    }
    0.6 * jaccard(&a.tokens, &b.tokens) + 0.4 * strsim::normalized_levenshtein(&a.canonical, &b.canonical)
}

/// Text similarity plus a boost for overlapping methods, capped at 1.0.
pub fn claim_similarity(a: &ClaimProfile, b: &ClaimProfile, method_boost: f64) -> f64 {
    (text_similarity(a, b) + method_boost * jaccard(&a.methods, &b.methods)).min(1.0)
}

pub fn topic_overlap(a: &ClaimProfile, b: &ClaimProfile) -> f64 {
    jaccard(&a.topic, &b.topic)
}

// ── Profiled claims ───────────────────────────────────────────────────────────

/// A claim together with where it came from and its profile.
#[derive(Debug, Clone)]
pub struct ProfiledClaim<'a> {
    pub paper_id: &'a str,
    /// Position within the paper's claim list.
    pub position: usize,
    pub claim: &'a Claim,
    pub profile: ClaimProfile,
}

impl ProfiledClaim<'_> {
    pub fn claim_ref(&self) -> ClaimRef {
        ClaimRef::new(self.paper_id, &self.claim.id)
    }

    /// Ordering key: paper id, then claim position.
    pub fn sort_key(&self) -> (&str, usize) {
        (self.paper_id, self.position)
    }
}

/// Profile every claim of every paper, ordered by paper id then position.
pub fn profile_papers(papers: &[Paper]) -> Vec<ProfiledClaim<'_>> {
    let mut ordered: Vec<&Paper> = papers.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    ordered
        .into_iter()
        .flat_map(|paper| {
            paper.claims().iter().enumerate().map(move |(position, claim)| ProfiledClaim {
                paper_id: paper.id.as_str(),
                position,
                claim,
                profile: ClaimProfile::new(claim),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn claim(id: &str, text: &str, conf: f64, methods: &[&str]) -> Claim {
        Claim {
            id: id.to_string(),
            text: text.to_string(),
            confidence: conf,
            methods: methods.iter().map(|s| s.to_string()).collect(),
            metrics: BTreeSet::new(),
            provenance: vec!["chunk_0".to_string()],
            used_fallback: false,
        }
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("improves"), stem("improved"));
        assert_eq!(stem("improve"), stem("improving"));
        assert_eq!(stem("increases"), stem("increase"));
        assert_eq!(stem("loss"), "loss");
        assert_eq!(stem("losses"), "loss");
    }

    #[test]
    fn test_profile_masks_numbers_and_detects_negation() {
        let p = ClaimProfile::new(&claim("c", "Method X doesn't reach 95% accuracy", 0.9, &["X"]));
        assert!(p.negated);
        assert!(!p.tokens.iter().any(|t| t.contains("95")));
        assert_eq!(p.quantities, vec![Quantity { value: 95.0, percent: true }]);
        assert!(p.methods.contains("x"));
    }

    #[test]
    fn test_identifiers_are_topic_not_quantities() {
        let p = ClaimProfile::new(&claim("c", "ResNet50 reaches 76.1% top-1 accuracy on GPT-4 features", 0.9, &[]));
        assert_eq!(p.quantities, vec![Quantity { value: 76.1, percent: true }]);
        assert!(p.tokens.contains("resnet50"));
        assert!(p.tokens.contains("top-1"));
        assert!(p.topic.contains("gpt-4"));
    }

    #[test]
    fn test_directions() {
        let up = ClaimProfile::new(&claim("a", "Dropout increases robustness", 0.8, &[]));
        let down = ClaimProfile::new(&claim("b", "Dropout decreased robustness", 0.8, &[]));
        assert!(up.opposes(&down));
        assert!(!up.opposes(&up));
        assert!(topic_overlap(&up, &down) > 0.9);
    }

    #[test]
    fn test_near_identical_claims_are_similar() {
        let a = ClaimProfile::new(&claim("a", "Method X achieves 95% accuracy", 0.9, &["X"]));
        let b = ClaimProfile::new(&claim("b", "Method X achieves 94% accuracy", 0.85, &["X"]));
        assert!(claim_similarity(&a, &b, 0.1) >= 0.99);

        let c = ClaimProfile::new(&claim("c", "Transformers need large pretraining corpora", 0.9, &[]));
        assert!(claim_similarity(&a, &c, 0.1) < 0.3);
    }

    #[test]
    fn test_empty_profiles_are_dissimilar() {
        let a = ClaimProfile::new(&claim("a", "42", 0.9, &[]));
        let b = ClaimProfile::new(&claim("b", "42", 0.9, &[]));
        assert_eq!(text_similarity(&a, &b), 0.0);
    }
}
