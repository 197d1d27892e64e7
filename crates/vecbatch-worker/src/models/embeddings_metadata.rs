use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use vecbatch_chunkers::{Chunk, ChunkError, ChunkOptions, ChunkStrategy};

/// Which execution model produces the embeddings for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EmbeddingsType {
  /// Provider called directly, results awaited in-process
  #[serde(alias = "OPEN_AI")]
  ProviderSync,
  /// Chunk groups fanned out to model-named queues
  #[serde(alias = "HUGGING_FACE")]
  ProviderAsync,
  #[serde(other)]
  Unsupported,
}

/// Chunking and embedding configuration attached to a batch. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct EmbeddingsMetadata {
  pub embeddings_type: EmbeddingsType,
  pub chunk_size: usize,
  #[builder(default = 0)]
  #[serde(default)]
  pub chunk_overlap: usize,
  #[builder(default)]
  #[serde(default)]
  pub chunk_strategy: ChunkStrategy,
  /// Target model; names the fan-out queue on the asynchronous path
  #[builder(default, setter(strip_option, into))]
  #[serde(default, alias = "hugging_face_model_name")]
  pub model: Option<String>,
  #[builder(default, setter(strip_option, into))]
  #[serde(default)]
  pub docker_image: Option<String>,
}

impl EmbeddingsMetadata {
  pub fn chunk_options(&self) -> Result<ChunkOptions, ChunkError> {
    ChunkOptions::new(self.chunk_size, self.chunk_overlap)
  }

  /// Split `text` according to this configuration
  pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>, ChunkError> {
    let options = self.chunk_options()?;
    Ok(vecbatch_chunkers::chunk(text, self.chunk_strategy, options))
  }
}
