use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::PersistenceError;
use crate::models::{Batch, BatchStatus, JobStatus};
use crate::repository::BatchRepository;

/// Job and Batch status transitions around a dispatch.
///
/// Repository failures are logged and swallowed here: the in-memory `Batch`
/// still reflects the intended transition and processing continues, but the
/// persisted record may be stale.
pub struct BatchStateMachine {
  repository: Arc<dyn BatchRepository>,
}

impl BatchStateMachine {
  pub fn new(repository: Arc<dyn BatchRepository>) -> Self {
    Self { repository }
  }

  /// Move the batch to PROCESSING, counting a retry unless this is its first
  /// run, and move the job to PROCESSING_BATCHES if it has not got there yet.
  pub async fn begin_processing(&self, batch: &mut Batch) {
    self.advance_job(batch).await;

    if batch.status == BatchStatus::NotStarted {
      debug!(batch_id = batch.id, "Starting batch");
    } else {
      batch.retry_count += 1;
      info!(
        batch_id = batch.id,
        retry_count = batch.retry_count,
        previous_status = %batch.status,
        "Retrying batch"
      );
      swallow(
        self
          .repository
          .update_batch_retry_count(batch.id, batch.retry_count)
          .await,
        batch,
        "retry count",
      );
    }

    batch.status = BatchStatus::Processing;
    swallow(
      self
        .repository
        .update_batch_status(batch.id, BatchStatus::Processing)
        .await,
      batch,
      "status",
    );
  }

  pub async fn mark_failed(&self, batch: &mut Batch) {
    batch.status = BatchStatus::Failed;
    swallow(
      self
        .repository
        .update_batch_status(batch.id, BatchStatus::Failed)
        .await,
      batch,
      "status",
    );
    info!(batch_id = batch.id, "Batch failed");
  }

  async fn advance_job(&self, batch: &Batch) {
    let job = match self.repository.get_job(batch.job_id).await {
      Ok(job) => job,
      Err(e) => {
        error!(batch_id = batch.id, job_id = batch.job_id, error = %e, "Failed to load job");
        return;
      }
    };

    if !job.status.awaits_processing() {
      return;
    }

    match self
      .repository
      .update_job_status(job.id, JobStatus::ProcessingBatches)
      .await
    {
      Ok(()) => info!(job_id = job.id, from = %job.status, "Job is processing batches"),
      Err(e) => error!(job_id = job.id, error = %e, "Failed to update job status"),
    }
  }
}

fn swallow(result: Result<(), PersistenceError>, batch: &Batch, field: &str) {
  if let Err(e) = result {
    error!(batch_id = batch.id, field, error = %e, "Failed to persist batch update");
  }
}
