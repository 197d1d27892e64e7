use async_trait::async_trait;

pub mod batching;
pub mod error;
pub mod openailike;

pub use error::EmbeddingError;

/// Main trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
  /// Embed `texts` in one call. Vectors come back in input order.
  ///
  /// The key is supplied per call since every dispatch message carries its own.
  async fn embed(&self, texts: &[String], api_key: &str) -> Result<Vec<Vec<f32>>, EmbeddingError>;

  /// Maximum number of inputs accepted by a single call
  fn max_batch_size(&self) -> usize;

  /// Model identifier, used for logging
  fn model(&self) -> &str;
}
