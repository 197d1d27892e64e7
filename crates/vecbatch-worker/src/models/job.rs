use serde::{Deserialize, Serialize};

pub type JobId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
  NotStarted,
  CreatingBatches,
  ProcessingBatches,
  Completed,
  Failed,
}

impl JobStatus {
  /// Whether the first processed batch should move the job to `ProcessingBatches`
  pub fn awaits_processing(&self) -> bool {
    matches!(self, JobStatus::NotStarted | JobStatus::CreatingBatches)
  }
}

/// A unit of work requested by a caller, split into batches elsewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  pub id: JobId,
  #[serde(alias = "job_status")]
  pub status: JobStatus,
}
