//! iris-common: Shared types, errors, and configuration used across all IRIS crates.

pub mod error;
pub mod claims;
pub mod confidence;
pub mod engine_config;

// Re-export commonly used types
pub use claims::{Claim, ClaimRef, Paper, RawClaim};
pub use engine_config::{EngineConfig, ExtractionConfig, JobConfig, ThresholdConfig};
pub use error::{ErrorKind, IrisError, Result};
