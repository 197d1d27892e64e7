use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};
use vecbatch_chunkers::Chunk;

use crate::broker::QueuePublisher;
use crate::embeddings::batching::FixedSizeBatching;
use crate::error::DispatchError;
use crate::models::{Batch, Secrets, fan_out_payload};
use crate::repository::BatchRepository;
use crate::retry::RetryPolicy;

/// Publishes chunk groups to a queue named after the model. The embeddings
/// themselves are produced by an external consumer of that queue.
pub struct FanOutDispatcher {
  publisher: Arc<dyn QueuePublisher>,
  repository: Arc<dyn BatchRepository>,
  batching: FixedSizeBatching,
  retry: RetryPolicy,
}

impl FanOutDispatcher {
  pub fn new(
    publisher: Arc<dyn QueuePublisher>,
    repository: Arc<dyn BatchRepository>,
    minibatch_size: usize,
    retry: RetryPolicy,
  ) -> Self {
    Self {
      publisher,
      repository,
      batching: FixedSizeBatching::new(minibatch_size),
      retry,
    }
  }

  /// Returns the number of messages published.
  ///
  /// `minibatch_count` is written before the first publish; if any group
  /// exhausts its attempts the remaining groups are not sent.
  pub async fn dispatch(
    &self,
    batch: &Batch,
    chunks: Vec<Chunk>,
    secrets: &Secrets,
  ) -> Result<usize, DispatchError> {
    let metadata = &batch.embeddings_metadata;
    let queue = metadata
      .model
      .as_deref()
      .filter(|m| !m.trim().is_empty())
      .ok_or(DispatchError::MissingModel)?;

    let texts: Vec<String> = chunks.into_iter().map(Chunk::into_text).collect();
    let groups = self.batching.prepare_batches(texts);

    self
      .repository
      .update_minibatch_count(batch.id, groups.len() as u32)
      .await?;

    info!(
      batch_id = batch.id,
      queue,
      minibatches = groups.len(),
      docker_image = metadata.docker_image.as_deref().unwrap_or("-"),
      "Fanning out batch"
    );

    for (index, group) in groups.iter().enumerate() {
      let payload = Bytes::from(fan_out_payload(batch.id, group, &secrets.vector_store_key)?);

      self
        .retry
        .run(|_| {
          let payload = payload.clone();
          async move {
            self.publisher.declare(queue).await?;
            self.publisher.publish(queue, payload).await
          }
        })
        .await
        .map_err(|exhausted| DispatchError::PublishExhausted {
          queue: queue.to_string(),
          attempts: exhausted.attempts,
          source: exhausted.last_error,
        })?;

      debug!(batch_id = batch.id, queue, group = index, size = group.len(), "Published minibatch");
    }

    Ok(groups.len())
  }
}
