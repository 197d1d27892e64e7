use std::fmt;

use serde::Serialize;

use super::BatchId;
use crate::error::MalformedMessage;

/// Credentials carried through a dispatch. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
  pub vector_store_key: String,
  pub provider_api_key: String,
}

impl Secrets {
  pub fn new(vector_store_key: impl Into<String>, provider_api_key: impl Into<String>) -> Self {
    Self {
      vector_store_key: vector_store_key.into(),
      provider_api_key: provider_api_key.into(),
    }
  }
}

impl fmt::Debug for Secrets {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Secrets")
      .field("vector_store_key", &"<redacted>")
      .field("provider_api_key", &"<redacted>")
      .finish()
  }
}

/// Inbound work item: `[batch_id, [source_text...], vector_store_key, provider_api_key]`
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchMessage {
  pub batch_id: BatchId,
  pub source_text: Vec<String>,
  pub secrets: Secrets,
}

impl DispatchMessage {
  pub fn from_slice(payload: &[u8]) -> Result<Self, MalformedMessage> {
    let (batch_id, source_text, vector_store_key, provider_api_key): (
      BatchId,
      Vec<String>,
      String,
      String,
    ) = serde_json::from_slice(payload)?;

    Ok(Self {
      batch_id,
      source_text,
      secrets: Secrets {
        vector_store_key,
        provider_api_key,
      },
    })
  }
}

/// A chunk of text paired with its embedding vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddingResult {
  pub text: String,
  pub embedding: Vec<f32>,
}

impl EmbeddingResult {
  pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
    Self {
      text: text.into(),
      embedding,
    }
  }
}

/// Outbound upload: `[batch_id, [[text, vector]...], vector_store_key]`
pub fn upload_payload(
  batch_id: BatchId,
  results: &[EmbeddingResult],
  vector_store_key: &str,
) -> serde_json::Result<Vec<u8>> {
  let pairs: Vec<(&str, &[f32])> = results
    .iter()
    .map(|r| (r.text.as_str(), r.embedding.as_slice()))
    .collect();
  serde_json::to_vec(&(batch_id, pairs, vector_store_key))
}

/// Fan-out work item: `[batch_id, [chunk_text...], vector_store_key]`
pub fn fan_out_payload(
  batch_id: BatchId,
  chunks: &[String],
  vector_store_key: &str,
) -> serde_json::Result<Vec<u8>> {
  serde_json::to_vec(&(batch_id, chunks, vector_store_key))
}
