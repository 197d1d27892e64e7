use crate::reqwestx::api_client::ApiClientError;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
  #[error("API error: {0}")]
  Api(#[from] ApiClientError),

  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("Provider returned {got} embeddings for {expected} inputs")]
  CountMismatch { expected: usize, got: usize },

  #[error("Provider response is missing the embedding for input {0}")]
  MissingEmbedding(usize),

  #[error("Embedding operation failed: {0}")]
  EmbeddingFailed(String),
}
