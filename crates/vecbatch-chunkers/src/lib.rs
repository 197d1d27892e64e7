//! # vecbatch-chunkers
//!
//! Character-based text chunking for embedding pipelines.
//!
//! Source text is split into ordered chunks using one of three strategies:
//! a fixed sliding window ([`ChunkStrategy::Exact`]), paragraph-aware windows
//! ([`ChunkStrategy::Paragraph`]) or sentence splitting with a sliding-window
//! fallback for long sentences ([`ChunkStrategy::Sentence`]). All lengths are
//! measured in Unicode scalar values, never bytes.

mod chunker;
mod types;

pub use crate::chunker::{chunk, chunk_by_paragraph, chunk_by_sentence, chunk_exact, join_source};
pub use crate::types::{Chunk, ChunkError, ChunkOptions, ChunkStrategy, PARAGRAPH_SEARCH_BOUND};
