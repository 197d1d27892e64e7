use vecbatch_chunkers::ChunkError;

use crate::embeddings::EmbeddingError;
use crate::models::{BatchId, JobId};
use crate::reqwestx::api_client::ApiClientError;

/// Broker connection, declaration, publish and acknowledgement failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("Failed to connect to broker at {address}: {reason}")]
  Connect { address: String, reason: String },

  #[error("Failed to declare queue {queue}: {reason}")]
  Declare { queue: String, reason: String },

  #[error("Failed to publish to queue {queue}: {reason}")]
  Publish { queue: String, reason: String },

  #[error("Failed to acknowledge message: {0}")]
  Ack(String),

  #[error("Failed to receive message: {0}")]
  Consume(String),

  #[error("Consumer stream closed by broker")]
  ConsumerClosed,
}

/// Failures of the Job/Batch repository
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
  #[error("Batch {0} not found")]
  BatchNotFound(BatchId),

  #[error("Job {0} not found")]
  JobNotFound(JobId),

  #[error("Repository request failed: {0}")]
  Request(#[from] ApiClientError),

  #[error("Repository unavailable: {0}")]
  Unavailable(String),
}

/// A dispatch payload that could not be decoded
#[derive(Debug, thiserror::Error)]
#[error("Malformed dispatch message: {0}")]
pub struct MalformedMessage(#[from] pub serde_json::Error);

/// Reasons a batch ends up FAILED
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  #[error("Invalid chunk configuration: {0}")]
  Chunk(#[from] ChunkError),

  #[error("Batch produced no chunks to embed")]
  NothingToEmbed,

  #[error("Embedding group {group} failed after {attempts} attempts: {source}")]
  ProviderExhausted {
    group: usize,
    attempts: usize,
    #[source]
    source: EmbeddingError,
  },

  #[error("Publishing to {queue} failed after {attempts} attempts: {source}")]
  PublishExhausted {
    queue: String,
    attempts: usize,
    #[source]
    source: TransportError,
  },

  #[error("Failed to record minibatch count: {0}")]
  Persistence(#[from] PersistenceError),

  #[error("Asynchronous batch has no model identifier")]
  MissingModel,

  #[error("Unsupported embeddings type")]
  UnsupportedEmbeddingsType,

  #[error("Failed to encode outbound message: {0}")]
  Encode(#[from] serde_json::Error),

  #[error("Embedding worker aborted: {0}")]
  WorkerAborted(String),
}

/// Error type for the public API
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
  #[error(transparent)]
  Transport(#[from] TransportError),

  #[error(transparent)]
  Persistence(#[from] PersistenceError),

  #[error(transparent)]
  Malformed(#[from] MalformedMessage),

  #[error(transparent)]
  Dispatch(#[from] DispatchError),

  #[error(transparent)]
  Embedding(#[from] EmbeddingError),

  #[error("Configuration error: {0}")]
  Config(String),
}
