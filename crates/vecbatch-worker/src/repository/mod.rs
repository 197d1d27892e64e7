use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::models::{Batch, BatchId, BatchStatus, Job, JobId, JobStatus};

mod http;

pub use http::HttpBatchRepository;

/// Store of Job and Batch records owned by another service.
///
/// Each call is one request against the persisted record. Callers get no
/// transaction spanning several calls.
#[async_trait]
pub trait BatchRepository: Send + Sync {
  async fn get_batch(&self, id: BatchId) -> Result<Batch, PersistenceError>;

  async fn get_job(&self, id: JobId) -> Result<Job, PersistenceError>;

  async fn update_batch_status(&self, id: BatchId, status: BatchStatus) -> Result<(), PersistenceError>;

  async fn update_batch_retry_count(&self, id: BatchId, retry_count: u32) -> Result<(), PersistenceError>;

  async fn update_minibatch_count(&self, id: BatchId, minibatch_count: u32) -> Result<(), PersistenceError>;

  async fn update_job_status(&self, id: JobId, status: JobStatus) -> Result<(), PersistenceError>;
}
