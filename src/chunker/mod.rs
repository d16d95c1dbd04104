
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AskdocError, Result};

/// A contiguous passage of the source document, ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Trimmed passage text; never empty.
    pub text: String,
    /// Index of this chunk in the ordered chunk sequence. Doubles as the
    /// slot position in the vector index.
    pub position: usize,
}

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Overlap between adjacent windows in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

/// Split raw document text into overlapping fixed-size passages.
///
/// A window of `chunk_size` characters slides across the text, advancing by
/// `chunk_size - chunk_overlap` each step so that concepts spanning a window
/// boundary remain retrievable from at least one chunk. Each window is
/// trimmed; windows that trim to nothing are discarded. Window positions are
/// measured in characters, so multi-byte text never splits a code point.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    if config.chunk_size == 0 {
        return Err(AskdocError::Config(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if config.chunk_overlap >= config.chunk_size {
        return Err(AskdocError::Config(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    let step = config.chunk_size - config.chunk_overlap;

    // Byte offset of every character boundary, with the end of text as the
    // final entry, so windows can be sliced without re-walking the string.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(text.len());
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_len {
        let end = usize::min(start + config.chunk_size, char_len);
        let window = text.get(boundaries[start]..boundaries[end]).unwrap_or("");
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                text: trimmed.to_string(),
                position: chunks.len(),
            });
        }
        start += step;
    }

    debug!(
        "Split {} characters into {} chunks (size {}, overlap {})",
        char_len,
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}
