use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::embeddings::{EmbeddingError, EmbeddingProvider};

/// Provider returning deterministic vectors derived from each text
pub struct StaticEmbeddingProvider {
  dimension: usize,
  max_batch_size: usize,
  delay: Option<Duration>,
  fail_on: Option<String>,
  calls: AtomicUsize,
}

impl StaticEmbeddingProvider {
  pub fn new(dimension: usize, max_batch_size: usize) -> Self {
    Self {
      dimension,
      max_batch_size,
      delay: None,
      fail_on: None,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  /// Fail every call whose inputs include `text`
  pub fn failing_on(mut self, text: impl Into<String>) -> Self {
    self.fail_on = Some(text.into());
    self
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Deterministic normalized embedding for `text`
  pub fn embedding_for(&self, text: &str) -> Vec<f32> {
    let text_hash = text.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    let mut embedding: Vec<f32> = (0..self.dimension)
      .map(|i| ((text_hash.wrapping_mul(i as u32 + 1) % 1000) as f32) / 1000.0)
      .collect();

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
      for val in &mut embedding {
        *val /= norm;
      }
    }
    embedding
  }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbeddingProvider {
  async fn embed(&self, texts: &[String], _api_key: &str) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    self.calls.fetch_add(1, Ordering::SeqCst);

    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    if let Some(bad) = &self.fail_on {
      if texts.iter().any(|t| t == bad) {
        return Err(EmbeddingError::EmbeddingFailed(format!("refusing to embed {bad:?}")));
      }
    }

    Ok(texts.iter().map(|t| self.embedding_for(t)).collect())
  }

  fn max_batch_size(&self) -> usize {
    self.max_batch_size
  }

  fn model(&self) -> &str {
    "static"
  }
}
