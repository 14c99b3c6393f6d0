//! Background job registry.
//!
//! Every analysis or synthesis request runs as a job. Each job publishes its
//! status through a `watch` channel, so callers can either poll the latest
//! snapshot or await completion, and lifecycle events are broadcast for the
//! SSE stream. A job that exceeds the request timeout is dropped before it
//! writes anything and reported as failed. Finished jobs are forgotten once
//! they age past the retention window or the registry reaches its cap.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use iris_common::{ErrorKind, IrisError, JobConfig, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Analysis,
    Synthesis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&IrisError> for JobError {
    fn from(err: &IrisError) -> Self {
        Self { kind: err.kind(), message: err.public_message() }
    }
}

/// Current state of a job as seen by pollers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub session_id: String,
    /// Paper id for analysis jobs.
    pub subject: Option<String>,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<JobError>,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Events pushed to SSE subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    JobSubmitted { job_id: Uuid, kind: JobKind, session_id: String },
    JobStarted { job_id: Uuid, kind: JobKind, session_id: String },
    JobCompleted { job_id: Uuid, kind: JobKind, session_id: String },
    JobFailed { job_id: Uuid, kind: JobKind, session_id: String, error: JobError },
}

/// Awaitable handle for a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    pub job_id: Uuid,
    rx: watch::Receiver<JobSnapshot>,
}

impl JobHandle {
    /// Wait until the job completes or fails.
    pub async fn wait(mut self) -> JobSnapshot {
        if let Ok(snapshot) = self.rx.wait_for(|s| s.status.is_terminal()).await {
            return snapshot.clone();
        }
        // Sender gone: report whatever was last published.
        self.rx.borrow().clone()
    }
}

pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, Arc<watch::Sender<JobSnapshot>>>>,
    events: broadcast::Sender<JobEvent>,
    timeout: Duration,
    retention: Duration,
    max_retained: usize,
}

impl JobRegistry {
    pub fn new(config: &JobConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            jobs: RwLock::new(HashMap::new()),
            events,
            timeout: config.request_timeout(),
            retention: config.retention(),
            max_retained: config.max_retained.max(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Spawn `work` as a job and return a handle to it immediately.
    pub fn submit<F, T>(&self, kind: JobKind, session_id: &str, subject: Option<String>, work: F) -> JobHandle
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let job_id = Uuid::new_v4();
        let (tx, rx) = watch::channel(JobSnapshot {
            job_id,
            kind,
            session_id: session_id.to_string(),
            subject,
            status: JobStatus::Pending,
            result: None,
            error: None,
            submitted_at: Utc::now(),
            finished_at: None,
        });
        let tx = Arc::new(tx);
        {
            let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
            self.prune(&mut jobs, self.max_retained - 1);
            jobs.insert(job_id, tx.clone());
        }

        let session_id = session_id.to_string();
        let events = self.events.clone();
        let timeout = self.timeout;
        let _ = events.send(JobEvent::JobSubmitted { job_id, kind, session_id: session_id.clone() });

        tokio::spawn(async move {
            tx.send_modify(|s| s.status = JobStatus::Running);
            let _ = events.send(JobEvent::JobStarted { job_id, kind, session_id: session_id.clone() });

            let outcome = match tokio::time::timeout(timeout, work).await {
                Ok(Ok(value)) => serde_json::to_value(value).map_err(IrisError::from),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(IrisError::Timeout(timeout.as_secs())),
            };

            match outcome {
                Ok(value) => {
                    tx.send_modify(|s| {
                        s.status = JobStatus::Completed;
                        s.result = Some(value);
                        s.finished_at = Some(Utc::now());
                    });
                    info!(job_id = %job_id, kind = ?kind, session_id = %session_id, "Job completed");
                    let _ = events.send(JobEvent::JobCompleted { job_id, kind, session_id });
                }
                Err(e) => {
                    let error = JobError::from(&e);
                    warn!(job_id = %job_id, kind = ?kind, session_id = %session_id, error = %e, "Job failed");
                    tx.send_modify(|s| {
                        s.status = JobStatus::Failed;
                        s.error = Some(error.clone());
                        s.finished_at = Some(Utc::now());
                    });
                    let _ = events.send(JobEvent::JobFailed { job_id, kind, session_id, error });
                }
            }
        });

        JobHandle { job_id, rx }
    }

    /// Drop finished jobs past the retention window, then the oldest finished
    /// ones until at most `limit` remain. Pending and running jobs stay.
    fn prune(&self, jobs: &mut HashMap<Uuid, Arc<watch::Sender<JobSnapshot>>>, limit: usize) {
        let before = jobs.len();
        let now = Utc::now();
        let retention = self.retention;
        jobs.retain(|_, tx| match tx.borrow().finished_at {
            Some(at) => now.signed_duration_since(at).to_std().map_or(true, |age| age < retention),
            None => true,
        });

        if jobs.len() > limit {
            let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
                .iter()
                .filter_map(|(id, tx)| tx.borrow().finished_at.map(|at| (at, *id)))
                .collect();
            finished.sort();
            let excess = jobs.len() - limit;
            for (_, id) in finished.into_iter().take(excess) {
                jobs.remove(&id);
            }
        }

        if jobs.len() < before {
            debug!(evicted = before - jobs.len(), tracked = jobs.len(), "Pruned finished jobs");
        }
    }

    /// Latest snapshot of a job.
    pub fn get(&self, job_id: &Uuid) -> Result<JobSnapshot> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_id)
            .map(|tx| tx.borrow().clone())
            .ok_or_else(|| IrisError::JobNotFound(job_id.to_string()))
    }

    /// Handle for awaiting an already submitted job.
    pub fn handle(&self, job_id: &Uuid) -> Result<JobHandle> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(job_id)
            .map(|tx| JobHandle { job_id: *job_id, rx: tx.subscribe() })
            .ok_or_else(|| IrisError::JobNotFound(job_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
