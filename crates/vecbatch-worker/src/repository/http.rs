use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::BatchRepository;
use crate::config::RepositoryConfig;
use crate::error::PersistenceError;
use crate::models::{Batch, BatchId, BatchStatus, Job, JobId, JobStatus};
use crate::reqwestx::api_client::{ApiClient, ApiClientConfig, ApiClientError};

/// Repository backed by a JSON REST service exposing `/batches/{id}` and `/jobs/{id}`
pub struct HttpBatchRepository {
  client: ApiClient,
}

impl HttpBatchRepository {
  pub fn new(config: &RepositoryConfig) -> Result<Self, PersistenceError> {
    let client = ApiClient::new(ApiClientConfig {
      base_url: config.base_url.clone(),
      api_key: config.api_key.clone(),
      max_concurrent_requests: 8,
      timeout: config.timeout.inner(),
    })?;
    Ok(Self { client })
  }

  async fn patch(&self, path: String, body: serde_json::Value) -> Result<(), ApiClientError> {
    debug!(%path, %body, "Updating record");
    self.client.patch_json::<_, serde_json::Value>(&path, &body).await?;
    Ok(())
  }
}

fn not_found_as(
  err: ApiClientError,
  not_found: impl FnOnce() -> PersistenceError,
) -> PersistenceError {
  if err.status() == Some(404) {
    not_found()
  } else {
    PersistenceError::Request(err)
  }
}

#[async_trait]
impl BatchRepository for HttpBatchRepository {
  async fn get_batch(&self, id: BatchId) -> Result<Batch, PersistenceError> {
    self
      .client
      .get_json(&format!("/batches/{id}"))
      .await
      .map_err(|e| not_found_as(e, || PersistenceError::BatchNotFound(id)))
  }

  async fn get_job(&self, id: JobId) -> Result<Job, PersistenceError> {
    self
      .client
      .get_json(&format!("/jobs/{id}"))
      .await
      .map_err(|e| not_found_as(e, || PersistenceError::JobNotFound(id)))
  }

  async fn update_batch_status(&self, id: BatchId, status: BatchStatus) -> Result<(), PersistenceError> {
    self
      .patch(format!("/batches/{id}"), json!({ "status": status }))
      .await
      .map_err(|e| not_found_as(e, || PersistenceError::BatchNotFound(id)))
  }

  async fn update_batch_retry_count(&self, id: BatchId, retry_count: u32) -> Result<(), PersistenceError> {
    self
      .patch(format!("/batches/{id}"), json!({ "retry_count": retry_count }))
      .await
      .map_err(|e| not_found_as(e, || PersistenceError::BatchNotFound(id)))
  }

  async fn update_minibatch_count(&self, id: BatchId, minibatch_count: u32) -> Result<(), PersistenceError> {
    self
      .patch(format!("/batches/{id}"), json!({ "minibatch_count": minibatch_count }))
      .await
      .map_err(|e| not_found_as(e, || PersistenceError::BatchNotFound(id)))
  }

  async fn update_job_status(&self, id: JobId, status: JobStatus) -> Result<(), PersistenceError> {
    self
      .patch(format!("/jobs/{id}"), json!({ "status": status }))
      .await
      .map_err(|e| not_found_as(e, || PersistenceError::JobNotFound(id)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::EmbeddingsType;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  async fn repository_for(server: &MockServer) -> HttpBatchRepository {
    HttpBatchRepository::new(&RepositoryConfig {
      base_url: server.uri(),
      ..Default::default()
    })
    .unwrap()
  }

  #[tokio::test]
  async fn test_get_batch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/batches/11"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": 11,
        "job_id": 4,
        "status": "NOT_STARTED",
        "retry_count": 0,
        "embeddings_metadata": {
          "embeddings_type": "PROVIDER_SYNC",
          "chunk_size": 4,
          "chunk_overlap": 1
        }
      })))
      .mount(&mock_server)
      .await;

    let repository = repository_for(&mock_server).await;
    let batch = repository.get_batch(11).await.unwrap();

    assert_eq!(batch.job_id, 4);
    assert_eq!(batch.status, BatchStatus::NotStarted);
    assert_eq!(
      batch.embeddings_metadata.embeddings_type,
      EmbeddingsType::ProviderSync
    );
  }

  #[tokio::test]
  async fn test_missing_batch_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/batches/99"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&mock_server)
      .await;

    let repository = repository_for(&mock_server).await;
    let err = repository.get_batch(99).await.unwrap_err();

    assert!(matches!(err, PersistenceError::BatchNotFound(99)));
  }

  #[tokio::test]
  async fn test_updates_send_single_field_patches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
      .and(path("/batches/5"))
      .and(body_json(json!({"status": "FAILED"})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("PATCH"))
      .and(path("/batches/5"))
      .and(body_json(json!({"minibatch_count": 3})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
      .expect(1)
      .mount(&mock_server)
      .await;
    Mock::given(method("PATCH"))
      .and(path("/jobs/2"))
      .and(body_json(json!({"status": "PROCESSING_BATCHES"})))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&mock_server)
      .await;

    let repository = repository_for(&mock_server).await;
    repository.update_batch_status(5, BatchStatus::Failed).await.unwrap();
    repository.update_minibatch_count(5, 3).await.unwrap();
    repository
      .update_job_status(2, JobStatus::ProcessingBatches)
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_server_error_is_request_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
      .and(path("/batches/5"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&mock_server)
      .await;

    let repository = repository_for(&mock_server).await;
    let err = repository.update_batch_retry_count(5, 2).await.unwrap_err();

    assert!(matches!(err, PersistenceError::Request(_)));
  }
}
