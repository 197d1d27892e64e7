use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vecbatch_chunkers::Chunk;

use crate::embeddings::EmbeddingProvider;
use crate::embeddings::batching::FixedSizeBatching;
use crate::error::DispatchError;
use crate::models::{Batch, EmbeddingResult, Secrets};
use crate::retry::RetryPolicy;

/// Calls the embedding provider directly, a bounded number of groups at a time.
///
/// All or nothing: the first group to exhaust its retries aborts the others
/// and discards whatever they already returned.
pub struct SyncDispatcher {
  provider: Arc<dyn EmbeddingProvider>,
  pool_size: usize,
  retry: RetryPolicy,
}

impl SyncDispatcher {
  pub fn new(provider: Arc<dyn EmbeddingProvider>, pool_size: usize, retry: RetryPolicy) -> Self {
    Self {
      provider,
      pool_size: pool_size.max(1),
      retry,
    }
  }

  pub async fn dispatch(
    &self,
    batch: &Batch,
    chunks: Vec<Chunk>,
    secrets: &Secrets,
  ) -> Result<Vec<EmbeddingResult>, DispatchError> {
    if chunks.is_empty() {
      return Err(DispatchError::NothingToEmbed);
    }

    let batching = FixedSizeBatching::new(self.provider.max_batch_size());
    let texts: Vec<String> = chunks.into_iter().map(Chunk::into_text).collect();
    let groups = batching.prepare_batches(texts);

    info!(
      batch_id = batch.id,
      model = self.provider.model(),
      groups = groups.len(),
      pool_size = self.pool_size,
      "Embedding batch"
    );

    let permits = Arc::new(Semaphore::new(self.pool_size));
    let mut tasks = JoinSet::new();

    for (index, group) in groups.into_iter().enumerate() {
      let provider = self.provider.clone();
      let permits = permits.clone();
      let api_key = secrets.provider_api_key.clone();
      let retry = self.retry;
      let batch_id = batch.id;

      tasks.spawn(async move {
        let _permit = permits
          .acquire_owned()
          .await
          .map_err(|e| DispatchError::WorkerAborted(e.to_string()))?;

        debug!(batch_id, group = index, size = group.len(), "Embedding group");

        let vectors = retry
          .run(|_| provider.embed(&group, &api_key))
          .await
          .map_err(|exhausted| DispatchError::ProviderExhausted {
            group: index,
            attempts: exhausted.attempts,
            source: exhausted.last_error,
          })?;

        // Pair by content so completion order does not matter
        Ok::<_, DispatchError>(
          group
            .into_iter()
            .zip(vectors)
            .map(|(text, embedding)| EmbeddingResult::new(text, embedding))
            .collect::<Vec<_>>(),
        )
      });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
      let outcome = joined
        .map_err(|e| DispatchError::WorkerAborted(e.to_string()))
        .and_then(|group| group);

      match outcome {
        Ok(pairs) => results.extend(pairs),
        Err(e) => {
          warn!(batch_id = batch.id, error = %e, "Abandoning batch");
          tasks.abort_all();
          return Err(e);
        }
      }
    }

    Ok(results)
  }
}
