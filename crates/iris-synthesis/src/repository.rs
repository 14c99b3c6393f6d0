//! Session store - papers and synthesis results keyed by session.
//!
//! Writes are whole-value replacements, so readers see either the previous
//! or the next state of a paper or result, never a partial one.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use iris_common::{IrisError, Paper, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::SynthesisResult;

/// Read-only view of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Ordered by paper id.
    pub papers: Vec<Paper>,
    pub synthesis: Option<SynthesisResult>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session and return its id.
    async fn create_session(&self, user_id: Option<String>) -> Result<String>;

    async fn get_paper(&self, session_id: &str, paper_id: &str) -> Result<Option<Paper>>;

    /// Insert or replace a paper. The session is created if needed.
    async fn put_paper(&self, session_id: &str, paper: Paper) -> Result<()>;

    /// All papers of a session, ordered by id.
    async fn list_papers(&self, session_id: &str) -> Result<Vec<Paper>>;

    async fn get_synthesis(&self, session_id: &str) -> Result<Option<SynthesisResult>>;

    /// Replace the session's synthesis result.
    async fn put_synthesis(&self, session_id: &str, result: SynthesisResult) -> Result<()>;

    async fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>>;
}

#[derive(Debug)]
struct SessionRecord {
    user_id: Option<String>,
    created_at: DateTime<Utc>,
    papers: BTreeMap<String, Paper>,
    synthesis: Option<SynthesisResult>,
}

impl SessionRecord {
    fn new(user_id: Option<String>) -> Self {
        Self { user_id, created_at: Utc::now(), papers: BTreeMap::new(), synthesis: None }
    }
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> IrisError {
    IrisError::Store("session store lock poisoned".to_string())
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, user_id: Option<String>) -> Result<String> {
        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .write()
            .map_err(poisoned)?
            .insert(session_id.clone(), SessionRecord::new(user_id));
        tracing::debug!(session_id = %session_id, "Session created");
        Ok(session_id)
    }

    async fn get_paper(&self, session_id: &str, paper_id: &str) -> Result<Option<Paper>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).and_then(|s| s.papers.get(paper_id)).cloned())
    }

    async fn put_paper(&self, session_id: &str, paper: Paper) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord::new(None))
            .papers
            .insert(paper.id.clone(), paper);
        Ok(())
    }

    async fn list_papers(&self, session_id: &str) -> Result<Vec<Paper>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions
            .get(session_id)
            .map(|s| s.papers.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_synthesis(&self, session_id: &str) -> Result<Option<SynthesisResult>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).and_then(|s| s.synthesis.clone()))
    }

    async fn put_synthesis(&self, session_id: &str, result: SynthesisResult) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRecord::new(None))
            .synthesis = Some(result);
        Ok(())
    }

    async fn snapshot(&self, session_id: &str) -> Result<Option<SessionSnapshot>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).map(|s| SessionSnapshot {
            session_id: session_id.to_string(),
            user_id: s.user_id.clone(),
            created_at: s.created_at,
            papers: s.papers.values().cloned().collect(),
            synthesis: s.synthesis.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_session_returns_uuid() {
        let store = InMemorySessionStore::new();
        let id = store.create_session(Some("user-1".into())).await.unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        let snap = store.snapshot(&id).await.unwrap().unwrap();
        assert_eq!(snap.user_id.as_deref(), Some("user-1"));
        assert!(snap.papers.is_empty());
    }

    #[tokio::test]
    async fn test_put_paper_upserts_session() {
        let store = InMemorySessionStore::new();
        store.put_paper("s", Paper::new("p2", None, "two")).await.unwrap();
        store.put_paper("s", Paper::new("p1", None, "one")).await.unwrap();
        let ids: Vec<String> = store.list_papers("s").await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert!(store.get_paper("s", "p1").await.unwrap().is_some());
        assert!(store.get_paper("other", "p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_paper_replacement_is_wholesale() {
        let store = InMemorySessionStore::new();
        let paper = Paper::new("p", None, "text");
        store.put_paper("s", paper.clone()).await.unwrap();
        store.put_paper("s", paper.with_analysis(vec![], 1)).await.unwrap();
        let stored = store.get_paper("s", "p").await.unwrap().unwrap();
        assert!(stored.is_analyzed());
    }
}
