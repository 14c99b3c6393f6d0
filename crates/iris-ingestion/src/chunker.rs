//! Sentence-aware text chunker.
//!
//! Chunks are character windows with overlap. A window that does not reach
//! the end of the text is shortened to the last full stop inside it so that
//! sentences are not cut in half. Chunk ids (`chunk_0`, `chunk_1`, …) are
//! the provenance vocabulary for a paper.

use iris_common::ExtractionConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the chunker.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk.
    pub max_chars: usize,
    /// Character overlap between consecutive chunks.
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 1500,
            overlap_chars: 200,
        }
    }
}

impl From<&ExtractionConfig> for ChunkerConfig {
    fn from(cfg: &ExtractionConfig) -> Self {
        Self { max_chars: cfg.chunk_chars, overlap_chars: cfg.overlap_chars }
    }
}

/// A contiguous window of the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub content: String,
}

/// Canonical id for the chunk at `index`.
pub fn chunk_id(index: usize) -> String {
    format!("chunk_{index}")
}

/// Split `text` into overlapping, sentence-aligned chunks.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<TextChunk> {
    let text = text.replace('\r', " ");
    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n_chars = offsets.len() - 1;
    let max_chars = config.max_chars.max(1);

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < n_chars {
        let mut end = (start + max_chars).min(n_chars);

        if end < n_chars {
            let window = &text[offsets[start]..offsets[end]];
            if let Some(dot) = window.rfind('.') {
                let dot_byte = offsets[start] + dot;
                if let Ok(dot_char) = offsets.binary_search(&dot_byte) {
                    if dot_char > start {
                        end = dot_char + 1;
                    }
                }
            }
        }

        let content = text[offsets[start]..offsets[end]].trim();
        if !content.is_empty() {
            let index = chunks.len();
            chunks.push(TextChunk {
                chunk_id: chunk_id(index),
                chunk_index: index,
                content: content.to_string(),
            });
        }

        if end >= n_chars {
            break;
        }
        start = match end.checked_sub(config.overlap_chars) {
            Some(next) if next > start => next,
            _ => end,
        };
    }

    chunks
}
