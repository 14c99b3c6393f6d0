//! iris-synthesis: Cross-paper claim synthesis and evaluation.
//! Consensus grouping, contradiction detection, quality scoring, and the
//! orchestrator that runs them against a session store.

pub mod similarity;
pub mod conflict;
pub mod consensus;
pub mod result;
pub mod scoring;
pub mod repository;
pub mod locks;
pub mod metrics;
pub mod orchestrator;
pub mod jobs;

pub use conflict::{ConflictResolution, ConflictType, Contradiction};
pub use consensus::ConsensusGroup;
pub use jobs::{JobEvent, JobKind, JobRegistry, JobSnapshot, JobStatus};
pub use metrics::{Stage, StageMetrics};
pub use orchestrator::{SynthesisEngine, SynthesisTicket};
pub use repository::{InMemorySessionStore, SessionSnapshot, SessionStore};
pub use result::SynthesisResult;
pub use scoring::{EvaluationReport, PaperEvaluation};
