use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fraction of the chunk size after which the paragraph chunker starts
/// looking for a paragraph break.
pub const PARAGRAPH_SEARCH_BOUND: f64 = 0.75;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
  #[error("Chunk size must be positive")]
  ZeroChunkSize,

  #[error("Chunk overlap {overlap} must be smaller than chunk size {size}")]
  OverlapTooLarge { size: usize, overlap: usize },
}

/// How source text is split into chunks
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ChunkStrategy {
  /// Fixed-size sliding window
  #[default]
  Exact,
  /// Windows that prefer to end on a blank line
  Paragraph,
  /// One chunk per sentence, long sentences fall back to `Exact`
  Sentence,
}

/// Validated chunk size and overlap, both in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
  chunk_size: usize,
  chunk_overlap: usize,
}

impl ChunkOptions {
  pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkError> {
    if chunk_size == 0 {
      return Err(ChunkError::ZeroChunkSize);
    }
    if chunk_overlap >= chunk_size {
      return Err(ChunkError::OverlapTooLarge {
        size: chunk_size,
        overlap: chunk_overlap,
      });
    }
    Ok(Self {
      chunk_size,
      chunk_overlap,
    })
  }

  pub fn chunk_size(&self) -> usize {
    self.chunk_size
  }

  pub fn chunk_overlap(&self) -> usize {
    self.chunk_overlap
  }

  /// Distance between the starts of two consecutive exact windows. Always positive.
  pub fn step(&self) -> usize {
    self.chunk_size - self.chunk_overlap
  }
}

/// A piece of source text and its ordinal position in the chunk sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
  pub position: usize,
  pub text: String,
}

impl Chunk {
  pub fn new(position: usize, text: impl Into<String>) -> Self {
    Self {
      position,
      text: text.into(),
    }
  }

  pub fn into_text(self) -> String {
    self.text
  }
}
