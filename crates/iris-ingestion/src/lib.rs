//! iris-ingestion: Turning paper text into normalised claims.
//! - Sentence-aware chunking
//! - Claim extraction via the LLM collaborator
//! - Heuristic fallback extraction
//! - Normalisation and deduplication

pub mod chunker;
pub mod response;
pub mod heuristic;
pub mod extraction;
pub mod normalise;
pub mod dedup;

pub use chunker::{chunk_text, ChunkerConfig, TextChunk};
pub use extraction::{ClaimExtractor, ExtractionOutput, HeuristicExtractor, LlmClaimExtractor};
pub use normalise::ClaimNormaliser;
