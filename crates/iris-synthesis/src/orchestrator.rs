//! Synthesis orchestrator.
//!
//! Owns the writer discipline: one analysis at a time per (session, paper),
//! queued; one synthesis at a time per session, rejected with `Conflict`.
//! All computation happens before the single store write that publishes
//! its result, so a unit of work that is dropped part-way leaves the store
//! untouched.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use iris_common::{Claim, EngineConfig, IrisError, Paper, Result};
use iris_ingestion::{ClaimExtractor, ClaimNormaliser};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::locks::KeyedLocks;
use crate::metrics::{Stage, StageMetrics};
use crate::repository::{SessionSnapshot, SessionStore};
use crate::result::{synthesize_papers, SynthesisResult};
use crate::scoring::{build_report, EvaluationReport};

/// Proof that a synthesis for a session passed its pre-checks and holds the
/// session's writer lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct SynthesisTicket {
    session_id: String,
    paper_ids: Vec<String>,
    _guard: OwnedMutexGuard<()>,
}

impl SynthesisTicket {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn paper_ids(&self) -> &[String] {
        &self.paper_ids
    }
}

pub struct SynthesisEngine {
    store: Arc<dyn SessionStore>,
    extractor: Arc<dyn ClaimExtractor>,
    normaliser: ClaimNormaliser,
    config: EngineConfig,
    paper_locks: KeyedLocks,
    session_locks: KeyedLocks,
    metrics: StageMetrics,
}

impl SynthesisEngine {
    pub fn new(store: Arc<dyn SessionStore>, extractor: Arc<dyn ClaimExtractor>, config: EngineConfig) -> Self {
        Self {
            store,
            extractor,
            normaliser: ClaimNormaliser::new(config.thresholds.default_confidence),
            config,
            paper_locks: KeyedLocks::new(),
            session_locks: KeyedLocks::new(),
            metrics: StageMetrics::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    // ── Sessions and papers ───────────────────────────────────────────────

    pub async fn create_session(&self, user_id: Option<String>) -> Result<String> {
        self.store.create_session(user_id).await
    }

    pub async fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot> {
        self.store
            .snapshot(session_id)
            .await?
            .ok_or_else(|| IrisError::SessionNotFound(session_id.to_string()))
    }

    pub async fn get_paper(&self, session_id: &str, paper_id: &str) -> Result<Paper> {
        self.store
            .get_paper(session_id, paper_id)
            .await?
            .ok_or_else(|| IrisError::PaperNotFound(paper_id.to_string()))
    }

    /// Register paper text in a session. Re-registering an id replaces the
    /// paper and discards its previous analysis.
    pub async fn register_paper(
        &self,
        session_id: &str,
        paper_id: Option<String>,
        title: Option<String>,
        text: String,
    ) -> Result<Paper> {
        if text.trim().is_empty() {
            return Err(IrisError::InvalidRequest("paper text is empty".to_string()));
        }
        let paper_id = paper_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let _guard = self.paper_locks.lock(&paper_key(session_id, &paper_id)).await;

        let paper = Paper::new(paper_id, title, text);
        self.store.put_paper(session_id, paper.clone()).await?;
        info!(session_id, paper_id = %paper.id, chars = paper.text.len(), "Paper registered");
        Ok(paper)
    }

    // ── Analysis ──────────────────────────────────────────────────────────

    /// Analyze a paper, optionally supplying (new) text for it, and return
    /// its normalised claims.
    pub async fn analyze(&self, session_id: &str, paper_id: &str, text: Option<String>) -> Result<Vec<Claim>> {
        let source = text.map(|text| NewText { title: None, text });
        let paper = self.run_analysis(session_id, paper_id, source).await?;
        Ok(paper.claims.unwrap_or_default())
    }

    /// Analyze an already registered paper.
    pub async fn analyze_paper(&self, session_id: &str, paper_id: &str) -> Result<Paper> {
        self.run_analysis(session_id, paper_id, None).await
    }

    /// Analyze new text for a paper. The stored paper, and any previous
    /// analysis of it, is replaced only once extraction has finished. A
    /// missing title keeps the stored one.
    pub async fn analyze_text(
        &self,
        session_id: &str,
        paper_id: &str,
        title: Option<String>,
        text: String,
    ) -> Result<Paper> {
        if text.trim().is_empty() {
            return Err(IrisError::InvalidRequest("paper text is empty".to_string()));
        }
        self.run_analysis(session_id, paper_id, Some(NewText { title, text })).await
    }

    async fn run_analysis(&self, session_id: &str, paper_id: &str, source: Option<NewText>) -> Result<Paper> {
        let started = Instant::now();
        let result = self.analyze_locked(session_id, paper_id, source).await;
        self.metrics.record(Stage::Analysis, started.elapsed(), result.is_ok());
        result
    }

    #[instrument(skip(self, source), fields(has_text = source.is_some()))]
    async fn analyze_locked(&self, session_id: &str, paper_id: &str, source: Option<NewText>) -> Result<Paper> {
        let _guard = self.paper_locks.lock(&paper_key(session_id, paper_id)).await;

        let existing = self.store.get_paper(session_id, paper_id).await?;
        let paper = match (source, existing) {
            (Some(NewText { title, text }), existing) => {
                let title = title.or_else(|| existing.and_then(|p| p.title));
                Paper::new(paper_id, title, text)
            }
            (None, Some(paper)) => paper,
            (None, None) => return Err(IrisError::PaperNotFound(paper_id.to_string())),
        };

        let extract_started = Instant::now();
        let output = self.extractor.extract(paper_id, &paper.text).await;
        self.metrics.record(Stage::Extraction, extract_started.elapsed(), true);
        if output.fallback_chunks > 0 {
            self.metrics.record_fallbacks(Stage::Extraction, output.fallback_chunks as u64);
            warn!(paper_id, fallback_chunks = output.fallback_chunks, "Extraction used heuristic fallback");
        }

        let chunk_ids = output.chunk_ids();
        let num_chunks = output.chunks.len();
        let claims = self.normaliser.normalise(paper_id, output.claims, &chunk_ids);
        let analyzed = paper.with_analysis(claims, num_chunks);

        self.store.put_paper(session_id, analyzed.clone()).await?;
        info!(
            session_id,
            paper_id,
            claims = analyzed.claims().len(),
            used_fallback = analyzed.used_fallback,
            "Paper analyzed"
        );
        Ok(analyzed)
    }

    // ── Synthesis ─────────────────────────────────────────────────────────

    /// Run the synthesis pre-checks and take the session's writer lock.
    ///
    /// Fails with `InsufficientPapers` for fewer than two distinct ids,
    /// `Conflict` when a synthesis is already in flight, and `PaperNotFound`
    /// or `NotAnalyzed` for unusable papers.
    pub async fn reserve_synthesis(&self, session_id: &str, paper_ids: &[String]) -> Result<SynthesisTicket> {
        let ids: BTreeSet<&str> = paper_ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
        if ids.len() < 2 {
            return Err(IrisError::InsufficientPapers { found: ids.len() });
        }

        let guard = self
            .session_locks
            .try_lock(session_id)
            .ok_or_else(|| IrisError::Conflict { session_id: session_id.to_string() })?;

        let paper_ids: Vec<String> = ids.into_iter().map(str::to_string).collect();
        self.load_analyzed(session_id, &paper_ids).await?;

        Ok(SynthesisTicket { session_id: session_id.to_string(), paper_ids, _guard: guard })
    }

    /// Compute and store the synthesis for a reserved session.
    #[instrument(skip(self, ticket), fields(session_id = %ticket.session_id, papers = ticket.paper_ids.len()))]
    pub async fn run_synthesis(&self, ticket: SynthesisTicket) -> Result<SynthesisResult> {
        let started = Instant::now();
        let result: Result<SynthesisResult> = async {
            // Papers may have been re-analyzed since the reservation.
            let papers = self.load_analyzed(&ticket.session_id, &ticket.paper_ids).await?;
            let result = synthesize_papers(&papers, &self.config.thresholds);
            self.store.put_synthesis(&ticket.session_id, result.clone()).await?;
            Ok(result)
        }
        .await;
        self.metrics.record(Stage::Synthesis, started.elapsed(), result.is_ok());

        if let Ok(r) = &result {
            info!(
                consensus = r.num_consensus(),
                contradictions = r.num_contradictions(),
                digest = %r.input_digest,
                "Synthesis stored"
            );
        }
        drop(ticket);
        result
    }

    pub async fn synthesize(&self, session_id: &str, paper_ids: &[String]) -> Result<SynthesisResult> {
        let ticket = self.reserve_synthesis(session_id, paper_ids).await?;
        self.run_synthesis(ticket).await
    }

    async fn load_analyzed(&self, session_id: &str, paper_ids: &[String]) -> Result<Vec<Paper>> {
        let mut papers = Vec::with_capacity(paper_ids.len());
        for id in paper_ids {
            let paper = self
                .store
                .get_paper(session_id, id)
                .await?
                .ok_or_else(|| IrisError::PaperNotFound(id.clone()))?;
            if !paper.is_analyzed() {
                return Err(IrisError::NotAnalyzed { paper_id: id.clone() });
            }
            papers.push(paper);
        }
        Ok(papers)
    }

    // ── Evaluation ────────────────────────────────────────────────────────

    /// Evaluation report over the session's analyzed papers and its latest
    /// synthesis. `NoData` when nothing has been analyzed.
    pub async fn evaluate(&self, session_id: &str) -> Result<EvaluationReport> {
        let started = Instant::now();
        let result: Result<EvaluationReport> = async {
            let papers = self.store.list_papers(session_id).await?;
            if !papers.iter().any(Paper::is_analyzed) {
                return Err(IrisError::NoData { session_id: session_id.to_string() });
            }
            let synthesis = self.store.get_synthesis(session_id).await?;
            Ok(build_report(
                session_id,
                &papers,
                synthesis.as_ref(),
                self.config.thresholds.hallucination_confidence_threshold,
            ))
        }
        .await;
        self.metrics.record(Stage::Evaluation, started.elapsed(), result.is_ok());
        debug!(session_id, ok = result.is_ok(), "Evaluation computed");
        result
    }
}

/// Text supplied with an analysis request.
struct NewText {
    title: Option<String>,
    text: String,
}

fn paper_key(session_id: &str, paper_id: &str) -> String {
    format!("{session_id}/{paper_id}")
}
