use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{EmbeddingsMetadata, JobId};

pub type BatchId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
  NotStarted,
  Processing,
  Completed,
  Failed,
}

/// A slice of a job's source text, chunked and embedded as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct Batch {
  pub id: BatchId,
  pub job_id: JobId,
  #[builder(default = BatchStatus::NotStarted)]
  #[serde(alias = "batch_status")]
  pub status: BatchStatus,
  /// Incremented on every processing attempt, never reset
  #[builder(default = 0)]
  #[serde(default, alias = "retries")]
  pub retry_count: u32,
  /// Number of groups published for asynchronous embedding
  #[builder(default)]
  #[serde(default)]
  pub minibatch_count: Option<u32>,
  pub embeddings_metadata: EmbeddingsMetadata,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::EmbeddingsType;

  #[test]
  fn test_deserialize_batch() {
    let json = r#"{
      "id": 7,
      "job_id": 2,
      "batch_status": "PROCESSING",
      "retries": 1,
      "embeddings_metadata": {
        "embeddings_type": "OPEN_AI",
        "chunk_size": 512,
        "chunk_overlap": 32
      }
    }"#;
    let batch: Batch = serde_json::from_str(json).unwrap();

    assert_eq!(batch.status, BatchStatus::Processing);
    assert_eq!(batch.retry_count, 1);
    assert_eq!(batch.minibatch_count, None);
    assert_eq!(
      batch.embeddings_metadata.embeddings_type,
      EmbeddingsType::ProviderSync
    );
  }

  #[test]
  fn test_status_serializes_screaming_snake_case() {
    let json = serde_json::to_string(&BatchStatus::NotStarted).unwrap();
    assert_eq!(json, "\"NOT_STARTED\"");
    assert_eq!(BatchStatus::Failed.to_string(), "FAILED");
  }
}
