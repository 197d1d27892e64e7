use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::PersistenceError;
use crate::models::{Batch, BatchId, BatchStatus, Job, JobId, JobStatus};
use crate::repository::BatchRepository;

/// Repository holding records in memory and logging every write
#[derive(Default)]
pub struct InMemoryRepository {
  batches: DashMap<BatchId, Batch>,
  jobs: DashMap<JobId, Job>,
  writes: Mutex<Vec<String>>,
  fail_writes: AtomicBool,
}

impl InMemoryRepository {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_batch(&self, batch: Batch) {
    self.batches.insert(batch.id, batch);
  }

  pub fn insert_job(&self, id: JobId, status: JobStatus) {
    self.jobs.insert(id, Job { id, status });
  }

  pub fn batch(&self, id: BatchId) -> Option<Batch> {
    self.batches.get(&id).map(|b| b.clone())
  }

  pub fn job(&self, id: JobId) -> Option<Job> {
    self.jobs.get(&id).map(|j| j.clone())
  }

  /// Make every subsequent update fail with `PersistenceError::Unavailable`
  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  /// Updates applied so far, e.g. `"batch 1 status PROCESSING"`
  pub fn writes(&self) -> Vec<String> {
    self.writes.lock().map(|w| w.clone()).unwrap_or_default()
  }

  fn record(&self, entry: String) -> Result<(), PersistenceError> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(PersistenceError::Unavailable(format!("rejected write: {entry}")));
    }
    if let Ok(mut writes) = self.writes.lock() {
      writes.push(entry);
    }
    Ok(())
  }

  fn update_batch(&self, id: BatchId, f: impl FnOnce(&mut Batch)) -> Result<(), PersistenceError> {
    let mut batch = self
      .batches
      .get_mut(&id)
      .ok_or(PersistenceError::BatchNotFound(id))?;
    f(&mut batch);
    Ok(())
  }
}

#[async_trait]
impl BatchRepository for InMemoryRepository {
  async fn get_batch(&self, id: BatchId) -> Result<Batch, PersistenceError> {
    self.batch(id).ok_or(PersistenceError::BatchNotFound(id))
  }

  async fn get_job(&self, id: JobId) -> Result<Job, PersistenceError> {
    self.job(id).ok_or(PersistenceError::JobNotFound(id))
  }

  async fn update_batch_status(&self, id: BatchId, status: BatchStatus) -> Result<(), PersistenceError> {
    self.record(format!("batch {id} status {status}"))?;
    self.update_batch(id, |b| b.status = status)
  }

  async fn update_batch_retry_count(&self, id: BatchId, retry_count: u32) -> Result<(), PersistenceError> {
    self.record(format!("batch {id} retry_count {retry_count}"))?;
    self.update_batch(id, |b| b.retry_count = retry_count)
  }

  async fn update_minibatch_count(&self, id: BatchId, minibatch_count: u32) -> Result<(), PersistenceError> {
    self.record(format!("batch {id} minibatch_count {minibatch_count}"))?;
    self.update_batch(id, |b| b.minibatch_count = Some(minibatch_count))
  }

  async fn update_job_status(&self, id: JobId, status: JobStatus) -> Result<(), PersistenceError> {
    self.record(format!("job {id} status {status}"))?;
    let mut job = self.jobs.get_mut(&id).ok_or(PersistenceError::JobNotFound(id))?;
    job.status = status;
    Ok(())
  }
}
