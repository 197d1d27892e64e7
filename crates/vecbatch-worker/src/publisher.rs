use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info};

use crate::broker::QueuePublisher;
use crate::models::{BatchId, EmbeddingResult, Secrets, upload_payload};

/// Sends finished embeddings to the upload queue.
///
/// One attempt only. A failure is logged and the batch status is left as is.
pub struct DownstreamPublisher {
  publisher: Arc<dyn QueuePublisher>,
  upload_queue: String,
}

impl DownstreamPublisher {
  pub fn new(publisher: Arc<dyn QueuePublisher>, upload_queue: impl Into<String>) -> Self {
    Self {
      publisher,
      upload_queue: upload_queue.into(),
    }
  }

  /// Returns whether the broker accepted the message
  pub async fn publish(&self, batch_id: BatchId, results: &[EmbeddingResult], secrets: &Secrets) -> bool {
    let payload = match upload_payload(batch_id, results, &secrets.vector_store_key) {
      Ok(payload) => Bytes::from(payload),
      Err(e) => {
        error!(batch_id, error = %e, "Failed to encode upload message");
        return false;
      }
    };

    match self.publisher.publish(&self.upload_queue, payload).await {
      Ok(()) => {
        info!(batch_id, queue = %self.upload_queue, embeddings = results.len(), "Published embeddings");
        true
      }
      Err(e) => {
        error!(batch_id, queue = %self.upload_queue, error = %e, "Failed to publish embeddings");
        false
      }
    }
  }
}
