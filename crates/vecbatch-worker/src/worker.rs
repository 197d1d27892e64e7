use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::broker::{ConnectionManager, QueuePublisher};
use crate::config::WorkerConfig;
use crate::consumer::ConsumerLoop;
use crate::embeddings::EmbeddingProvider;
use crate::embeddings::openailike::OpenAILikeEmbeddingProvider;
use crate::error::WorkerError;
use crate::processor::BatchProcessor;
use crate::repository::{BatchRepository, HttpBatchRepository};

/// Long-running worker: connect, consume until the connection drops, repeat.
pub struct Worker {
  config: WorkerConfig,
  repository: Arc<dyn BatchRepository>,
  provider: Arc<dyn EmbeddingProvider>,
}

impl Worker {
  pub fn new(
    config: WorkerConfig,
    repository: Arc<dyn BatchRepository>,
    provider: Arc<dyn EmbeddingProvider>,
  ) -> Self {
    Self {
      config,
      repository,
      provider,
    }
  }

  /// Worker backed by the HTTP repository and the OpenAI-compatible provider
  pub fn from_config(config: WorkerConfig) -> Result<Self, WorkerError> {
    config.validate()?;
    let repository = Arc::new(HttpBatchRepository::new(&config.repository)?);
    let provider = Arc::new(OpenAILikeEmbeddingProvider::new(&config.sync_provider)?);
    Ok(Self::new(config, repository, provider))
  }

  pub fn processor(&self, publisher: Arc<dyn QueuePublisher>) -> BatchProcessor {
    BatchProcessor::new(
      &self.config,
      self.repository.clone(),
      self.provider.clone(),
      publisher,
    )
  }

  /// Runs until `shutdown` is cancelled. Broker failures never end the loop.
  pub async fn run(&self, shutdown: CancellationToken) -> Result<(), WorkerError> {
    let manager = ConnectionManager::new(self.config.broker.clone());
    info!(
      address = %self.config.broker.address(),
      consume_queue = %self.config.broker.consume_queue,
      "Starting worker"
    );

    loop {
      let Some(channels) = manager.connect_with_retry(&shutdown).await else {
        break;
      };

      let consumer = ConsumerLoop::new(self.processor(channels.publish));
      match consumer.run(channels.consume, &shutdown).await {
        Ok(()) => break,
        Err(e) => {
          warn!(error = %e, retry_in = %self.config.broker.retry_interval, "Lost broker connection");
          tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(self.config.broker.retry_interval.inner()) => {}
          }
        }
      }
    }

    info!("Worker stopped");
    Ok(())
  }
}
