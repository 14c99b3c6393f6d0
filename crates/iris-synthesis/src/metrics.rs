//! Per-stage call, error, fallback and latency counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Analysis,
    Synthesis,
    Evaluation,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Extraction, Stage::Analysis, Stage::Synthesis, Stage::Evaluation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Analysis => "analysis",
            Stage::Synthesis => "synthesis",
            Stage::Evaluation => "evaluation",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct StageCounters {
    calls: AtomicU64,
    errors: AtomicU64,
    fallbacks: AtomicU64,
    total_latency_ms: AtomicU64,
    max_latency_ms: AtomicU64,
}

/// Point-in-time copy of one stage's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSnapshot {
    pub stage: Stage,
    pub calls: u64,
    pub errors: u64,
    pub fallbacks: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: u64,
}

#[derive(Debug, Default)]
pub struct StageMetrics {
    stages: [StageCounters; 4],
}

impl StageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call of `stage`.
    pub fn record(&self, stage: Stage, latency: Duration, ok: bool) {
        let c = &self.stages[stage.index()];
        let ms = latency.as_millis() as u64;
        c.calls.fetch_add(1, Ordering::Relaxed);
        if !ok {
            c.errors.fetch_add(1, Ordering::Relaxed);
        }
        c.total_latency_ms.fetch_add(ms, Ordering::Relaxed);
        c.max_latency_ms.fetch_max(ms, Ordering::Relaxed);
    }

    /// Record `count` fallbacks taken inside `stage`.
    pub fn record_fallbacks(&self, stage: Stage, count: u64) {
        self.stages[stage.index()].fallbacks.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Vec<StageSnapshot> {
        Stage::ALL
            .iter()
            .map(|&stage| {
                let c = &self.stages[stage.index()];
                let calls = c.calls.load(Ordering::Relaxed);
                let total = c.total_latency_ms.load(Ordering::Relaxed);
                StageSnapshot {
                    stage,
                    calls,
                    errors: c.errors.load(Ordering::Relaxed),
                    fallbacks: c.fallbacks.load(Ordering::Relaxed),
                    avg_latency_ms: if calls == 0 { 0.0 } else { total as f64 / calls as f64 },
                    max_latency_ms: c.max_latency_ms.load(Ordering::Relaxed),
                }
            })
            .collect()
    }
}
