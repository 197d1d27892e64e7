use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use vecbatch_chunkers::join_source;

use crate::broker::QueuePublisher;
use crate::config::WorkerConfig;
use crate::consumer::MessageHandler;
use crate::dispatch::{FanOutDispatcher, SyncDispatcher};
use crate::embeddings::EmbeddingProvider;
use crate::error::{DispatchError, WorkerError};
use crate::models::{Batch, DispatchMessage, EmbeddingsType};
use crate::publisher::DownstreamPublisher;
use crate::repository::BatchRepository;
use crate::retry::RetryPolicy;
use crate::state::BatchStateMachine;

/// What happened to a batch that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
  /// Embedded in-process; `published` is false when the upload was lost
  Uploaded { embeddings: usize, published: bool },
  /// Handed to the model queue as this many messages
  FannedOut { minibatches: usize },
}

/// Processes one dispatch message from payload to upload or fan-out
pub struct BatchProcessor {
  repository: Arc<dyn BatchRepository>,
  state: BatchStateMachine,
  sync: SyncDispatcher,
  fan_out: FanOutDispatcher,
  upload: DownstreamPublisher,
}

impl BatchProcessor {
  pub fn new(
    config: &WorkerConfig,
    repository: Arc<dyn BatchRepository>,
    provider: Arc<dyn EmbeddingProvider>,
    publisher: Arc<dyn QueuePublisher>,
  ) -> Self {
    let sync = SyncDispatcher::new(
      provider,
      config.sync_provider.pool_size,
      RetryPolicy::exponential(
        config.sync_provider.max_attempts,
        config.sync_provider.backoff_base.inner(),
      ),
    );
    let fan_out = FanOutDispatcher::new(
      publisher.clone(),
      repository.clone(),
      config.async_provider.minibatch_size,
      RetryPolicy::fixed(
        config.async_provider.max_attempts,
        config.broker.retry_interval.inner(),
      ),
    );

    Self {
      state: BatchStateMachine::new(repository.clone()),
      repository,
      sync,
      fan_out,
      upload: DownstreamPublisher::new(publisher, config.broker.upload_queue.clone()),
    }
  }

  /// Decode, mark as processing, dispatch. Any dispatch failure marks the
  /// batch FAILED before being returned.
  pub async fn handle_payload(&self, payload: &[u8]) -> Result<BatchOutcome, WorkerError> {
    let message = DispatchMessage::from_slice(payload)?;
    let mut batch = self.repository.get_batch(message.batch_id).await?;

    info!(
      batch_id = batch.id,
      job_id = batch.job_id,
      status = %batch.status,
      embeddings_type = %batch.embeddings_metadata.embeddings_type,
      "Received batch"
    );

    self.state.begin_processing(&mut batch).await;

    match self.process(&batch, message).await {
      Ok(outcome) => {
        info!(batch_id = batch.id, ?outcome, "Batch dispatched");
        Ok(outcome)
      }
      Err(e) => {
        error!(batch_id = batch.id, error = %e, "Batch processing failed");
        self.state.mark_failed(&mut batch).await;
        Err(e.into())
      }
    }
  }

  async fn process(&self, batch: &Batch, message: DispatchMessage) -> Result<BatchOutcome, DispatchError> {
    let metadata = &batch.embeddings_metadata;
    if metadata.embeddings_type == EmbeddingsType::Unsupported {
      return Err(DispatchError::UnsupportedEmbeddingsType);
    }

    let text = join_source(&message.source_text);
    let chunks = metadata.chunk(&text)?;

    match metadata.embeddings_type {
      EmbeddingsType::ProviderSync => {
        let results = self.sync.dispatch(batch, chunks, &message.secrets).await?;
        let published = self.upload.publish(batch.id, &results, &message.secrets).await;
        Ok(BatchOutcome::Uploaded {
          embeddings: results.len(),
          published,
        })
      }
      EmbeddingsType::ProviderAsync => {
        let minibatches = self.fan_out.dispatch(batch, chunks, &message.secrets).await?;
        Ok(BatchOutcome::FannedOut { minibatches })
      }
      EmbeddingsType::Unsupported => Err(DispatchError::UnsupportedEmbeddingsType),
    }
  }
}

#[async_trait]
impl MessageHandler for BatchProcessor {
  async fn handle(&self, payload: &[u8]) -> Result<BatchOutcome, WorkerError> {
    self.handle_payload(payload).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::duration::HumanDuration;
  use crate::models::{BatchStatus, EmbeddingsMetadata, JobStatus};
  use crate::testing::{InMemoryRepository, RecordingPublisher, StaticEmbeddingProvider};
  use serde_json::json;
  use std::collections::HashSet;
  use vecbatch_chunkers::ChunkStrategy;

  const UPLOAD: &str = "vector_upload";

  struct Harness {
    repository: Arc<InMemoryRepository>,
    publisher: Arc<RecordingPublisher>,
    provider: Arc<StaticEmbeddingProvider>,
    processor: BatchProcessor,
  }

  fn harness(provider: StaticEmbeddingProvider) -> Harness {
    let mut config = WorkerConfig::default();
    config.sync_provider.pool_size = 2;
    config.sync_provider.backoff_base = HumanDuration::from_millis(1);
    config.async_provider.minibatch_size = 3;
    config.broker.retry_interval = HumanDuration::from_millis(1);
    config.broker.upload_queue = UPLOAD.to_string();

    let repository = Arc::new(InMemoryRepository::new());
    repository.insert_job(1, JobStatus::CreatingBatches);
    let publisher = Arc::new(RecordingPublisher::new());
    let provider = Arc::new(provider);
    let processor = BatchProcessor::new(
      &config,
      repository.clone(),
      provider.clone(),
      publisher.clone(),
    );

    Harness {
      repository,
      publisher,
      provider,
      processor,
    }
  }

  fn insert_batch(repository: &InMemoryRepository, id: i64, metadata: EmbeddingsMetadata) {
    repository.insert_batch(Batch::builder().id(id).job_id(1).embeddings_metadata(metadata).build());
  }

  fn exact(embeddings_type: EmbeddingsType) -> EmbeddingsMetadata {
    EmbeddingsMetadata::builder()
      .embeddings_type(embeddings_type)
      .chunk_size(4)
      .chunk_overlap(1)
      .chunk_strategy(ChunkStrategy::Exact)
      .build()
  }

  fn payload(batch_id: i64, parts: &[&str]) -> Vec<u8> {
    serde_json::to_vec(&json!([batch_id, parts, "vs-key", "pk"])).unwrap()
  }

  #[tokio::test]
  async fn test_sync_batch_end_to_end() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));
    insert_batch(&h.repository, 1, exact(EmbeddingsType::ProviderSync));

    let outcome = h
      .processor
      .handle_payload(&payload(1, &["ABCDE", "FGHIJ"]))
      .await
      .unwrap();

    assert_eq!(
      outcome,
      BatchOutcome::Uploaded {
        embeddings: 4,
        published: true
      }
    );
    assert_eq!(h.provider.calls(), 2);

    let uploads = h.publisher.published_to(UPLOAD);
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0][0], json!(1));
    assert_eq!(uploads[0][2], json!("vs-key"));
    let texts: HashSet<String> = uploads[0][1]
      .as_array()
      .unwrap()
      .iter()
      .map(|pair| pair[0].as_str().unwrap().to_string())
      .collect();
    let expected: HashSet<String> = ["ABCD", "DEFG", "GHIJ", "J"].map(String::from).into();
    assert_eq!(texts, expected);

    assert_eq!(h.repository.batch(1).unwrap().status, BatchStatus::Processing);
    assert_eq!(h.repository.job(1).unwrap().status, JobStatus::ProcessingBatches);
  }

  #[tokio::test]
  async fn test_sync_failure_marks_failed_without_upload() {
    let h = harness(StaticEmbeddingProvider::new(8, 2).failing_on("J"));
    insert_batch(&h.repository, 1, exact(EmbeddingsType::ProviderSync));

    let err = h
      .processor
      .handle_payload(&payload(1, &["ABCDEFGHIJ"]))
      .await
      .unwrap_err();

    assert!(matches!(
      err,
      WorkerError::Dispatch(DispatchError::ProviderExhausted { .. })
    ));
    assert_eq!(h.repository.batch(1).unwrap().status, BatchStatus::Failed);
    assert_eq!(h.publisher.published_count(), 0);
  }

  #[tokio::test]
  async fn test_upload_failure_leaves_status_alone() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));
    h.publisher.fail_next(1);
    insert_batch(&h.repository, 1, exact(EmbeddingsType::ProviderSync));

    let outcome = h.processor.handle_payload(&payload(1, &["ABCDEFGHIJ"])).await.unwrap();

    assert_eq!(
      outcome,
      BatchOutcome::Uploaded {
        embeddings: 4,
        published: false
      }
    );
    assert_eq!(h.publisher.attempts(), 1);
    assert_eq!(h.repository.batch(1).unwrap().status, BatchStatus::Processing);
  }

  #[tokio::test]
  async fn test_empty_sync_batch_fails() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));
    insert_batch(&h.repository, 1, exact(EmbeddingsType::ProviderSync));

    let err = h.processor.handle_payload(&payload(1, &[])).await.unwrap_err();

    assert!(matches!(err, WorkerError::Dispatch(DispatchError::NothingToEmbed)));
    assert_eq!(h.repository.batch(1).unwrap().status, BatchStatus::Failed);
  }

  #[tokio::test]
  async fn test_async_batch_fans_out() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));
    let metadata = EmbeddingsMetadata {
      model: Some("bge-small".to_string()),
      ..exact(EmbeddingsType::ProviderAsync)
    };
    insert_batch(&h.repository, 2, metadata);

    let outcome = h.processor.handle_payload(&payload(2, &["ABCDEFGHIJ"])).await.unwrap();

    assert_eq!(outcome, BatchOutcome::FannedOut { minibatches: 2 });
    assert_eq!(h.repository.batch(2).unwrap().minibatch_count, Some(2));
    assert_eq!(h.publisher.published_to("bge-small").len(), 2);
    assert_eq!(h.provider.calls(), 0);
  }

  #[tokio::test]
  async fn test_unsupported_type_marks_failed() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));
    insert_batch(&h.repository, 1, exact(EmbeddingsType::Unsupported));

    let err = h.processor.handle_payload(&payload(1, &["ABCDEFGHIJ"])).await.unwrap_err();

    assert!(matches!(
      err,
      WorkerError::Dispatch(DispatchError::UnsupportedEmbeddingsType)
    ));
    assert_eq!(h.repository.batch(1).unwrap().status, BatchStatus::Failed);
  }

  #[tokio::test]
  async fn test_invalid_chunk_configuration_marks_failed() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));
    let metadata = EmbeddingsMetadata {
      chunk_overlap: 4,
      ..exact(EmbeddingsType::ProviderSync)
    };
    insert_batch(&h.repository, 1, metadata);

    let err = h.processor.handle_payload(&payload(1, &["ABCDEFGHIJ"])).await.unwrap_err();

    assert!(matches!(err, WorkerError::Dispatch(DispatchError::Chunk(_))));
    assert_eq!(h.repository.batch(1).unwrap().status, BatchStatus::Failed);
  }

  #[tokio::test]
  async fn test_malformed_payload_touches_nothing() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));

    let err = h.processor.handle_payload(b"[1, 2").await.unwrap_err();

    assert!(matches!(err, WorkerError::Malformed(_)));
    assert!(h.repository.writes().is_empty());
  }

  #[tokio::test]
  async fn test_unknown_batch_is_persistence_error() {
    let h = harness(StaticEmbeddingProvider::new(8, 2));

    let err = h.processor.handle_payload(&payload(77, &["x"])).await.unwrap_err();

    assert!(matches!(err, WorkerError::Persistence(_)));
  }
}
