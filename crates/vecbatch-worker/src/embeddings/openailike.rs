use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingError, EmbeddingProvider};
use crate::config::SyncProviderConfig;
use crate::reqwestx::api_client::{ApiClient, ApiClientConfig};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
  input: &'a [String],
  model: &'a str,
  encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
  index: usize,
  embedding: Vec<f32>,
}

/// OpenAI-compatible embedding provider
pub struct OpenAILikeEmbeddingProvider {
  client: ApiClient,
  model: String,
  max_batch_size: usize,
}

impl OpenAILikeEmbeddingProvider {
  pub fn new(config: &SyncProviderConfig) -> Result<Self, EmbeddingError> {
    if config.model.is_empty() {
      return Err(EmbeddingError::InvalidConfig(
        "sync_provider.model must be set".to_string(),
      ));
    }

    let client = ApiClient::new(ApiClientConfig {
      base_url: config.api_base.clone(),
      api_key: None,
      max_concurrent_requests: config.pool_size,
      timeout: config.timeout.inner(),
    })?;

    Ok(Self {
      client,
      model: config.model.clone(),
      max_batch_size: config.max_items_per_call,
    })
  }
}

#[async_trait]
impl EmbeddingProvider for OpenAILikeEmbeddingProvider {
  async fn embed(&self, texts: &[String], api_key: &str) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let request = EmbeddingRequest {
      input: texts,
      model: &self.model,
      encoding_format: "float",
    };

    debug!(model = %self.model, inputs = texts.len(), "Requesting embeddings");

    let response: EmbeddingResponse = self
      .client
      .post_json("/embeddings", &request, Some(api_key))
      .await?;

    if response.data.len() != texts.len() {
      return Err(EmbeddingError::CountMismatch {
        expected: texts.len(),
        got: response.data.len(),
      });
    }

    // The API may return entries out of order; place each by its index
    let mut embeddings: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
    for data in response.data {
      if let Some(slot) = embeddings.get_mut(data.index) {
        *slot = Some(data.embedding);
      }
    }

    embeddings
      .into_iter()
      .enumerate()
      .map(|(i, e)| e.ok_or(EmbeddingError::MissingEmbedding(i)))
      .collect()
  }

  fn max_batch_size(&self) -> usize {
    self.max_batch_size
  }

  fn model(&self) -> &str {
    &self.model
  }
}
