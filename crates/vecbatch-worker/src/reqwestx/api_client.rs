use std::sync::Arc;
use std::time::Duration;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Request failed with status {status}: {body}")]
  Status { status: u16, body: String },

  #[error("Failed to decode response body: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("Invalid header value: {0}")]
  InvalidHeader(#[from] http::header::InvalidHeaderValue),

  #[error("Client is shutting down")]
  Closed,
}

impl ApiClientError {
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Status { status, .. } => Some(*status),
      Self::Http(e) => e.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
  pub base_url: String,
  /// Sent as a bearer token unless a request supplies its own
  pub api_key: Option<String>,
  pub max_concurrent_requests: usize,
  pub timeout: Duration,
}

impl Default for ApiClientConfig {
  fn default() -> Self {
    Self {
      base_url: String::new(),
      api_key: None,
      max_concurrent_requests: 64,
      timeout: Duration::from_secs(30),
    }
  }
}

/// JSON-over-HTTP client with bounded concurrency. Makes exactly one attempt
/// per call; retries are the caller's concern.
pub struct ApiClient {
  client: Client,
  config: ApiClientConfig,
  concurrent_semaphore: Arc<Semaphore>,
}

impl ApiClient {
  pub fn new(config: ApiClientConfig) -> Result<Self, ApiClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = Client::builder()
      .default_headers(headers)
      .user_agent(concat!("vecbatch/", env!("CARGO_PKG_VERSION")))
      .timeout(config.timeout)
      .build()?;

    let concurrent_semaphore = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));

    Ok(Self {
      client,
      config,
      concurrent_semaphore,
    })
  }

  pub async fn get_json<Res>(&self, path: &str) -> Result<Res, ApiClientError>
  where
    Res: DeserializeOwned,
  {
    self.send(Method::GET, path, None::<&()>, None).await
  }

  /// POST `payload`, authenticating with `api_key` when given
  pub async fn post_json<Req, Res>(
    &self,
    path: &str,
    payload: &Req,
    api_key: Option<&str>,
  ) -> Result<Res, ApiClientError>
  where
    Req: Serialize + ?Sized,
    Res: DeserializeOwned,
  {
    self.send(Method::POST, path, Some(payload), api_key).await
  }

  pub async fn patch_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, ApiClientError>
  where
    Req: Serialize + ?Sized,
    Res: DeserializeOwned,
  {
    self.send(Method::PATCH, path, Some(payload), None).await
  }

  async fn send<Req, Res>(
    &self,
    method: Method,
    path: &str,
    payload: Option<&Req>,
    api_key: Option<&str>,
  ) -> Result<Res, ApiClientError>
  where
    Req: Serialize + ?Sized,
    Res: DeserializeOwned,
  {
    let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);

    let _permit = self
      .concurrent_semaphore
      .acquire()
      .await
      .map_err(|_| ApiClientError::Closed)?;

    debug!(%method, %url, "Sending request");

    let mut request = self.client.request(method, &url);
    if let Some(payload) = payload {
      request = request.body(serde_json::to_vec(payload)?);
    }
    if let Some(key) = api_key.or(self.config.api_key.as_deref()) {
      request = request.header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiClientError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let body = response.bytes().await?;
    trace!(%url, bytes = body.len(), "Response body received");

    // Empty bodies decode as JSON null so callers can ask for `()`
    if body.is_empty() {
      return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(&body)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;
  use std::time::Instant;
  use wiremock::matchers::{body_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[derive(Serialize)]
  struct TestRequest {
    message: String,
  }

  #[derive(Deserialize, PartialEq, Debug)]
  struct TestResponse {
    result: String,
  }

  fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(ApiClientConfig {
      base_url: server.uri(),
      ..Default::default()
    })
    .unwrap()
  }

  #[tokio::test]
  async fn test_successful_post() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
      .and(path("/test"))
      .and(body_json(serde_json::json!({"message": "test"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
          "result": "success"
      })))
      .mount(&mock_server)
      .await;

    let client = client_for(&mock_server);
    let request = TestRequest {
      message: "test".to_string(),
    };

    let response: TestResponse = client.post_json("/test", &request, None).await.unwrap();
    assert_eq!(response.result, "success");
  }

  #[tokio::test]
  async fn test_per_request_api_key_overrides_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
      .and(path("/test"))
      .and(header("Authorization", "Bearer per_request"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
          "result": "authorized"
      })))
      .mount(&mock_server)
      .await;

    let client = ApiClient::new(ApiClientConfig {
      base_url: mock_server.uri(),
      api_key: Some("default_key".to_string()),
      ..Default::default()
    })
    .unwrap();
    let request = TestRequest {
      message: "test".to_string(),
    };

    let response: TestResponse = client
      .post_json("/test", &request, Some("per_request"))
      .await
      .unwrap();
    assert_eq!(response.result, "authorized");
  }

  #[tokio::test]
  async fn test_single_attempt_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/test"))
      .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
      .expect(1)
      .mount(&mock_server)
      .await;

    let client = client_for(&mock_server);
    let err = client.get_json::<TestResponse>("/test").await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("overloaded"));
  }

  #[tokio::test]
  async fn test_client_error_status_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
      .and(path("/test"))
      .respond_with(ResponseTemplate::new(404))
      .mount(&mock_server)
      .await;

    let client = client_for(&mock_server);
    let err = client
      .patch_json::<_, ()>("/test", &serde_json::json!({}))
      .await
      .unwrap_err();

    assert_eq!(err.status(), Some(404));
  }

  #[tokio::test]
  async fn test_empty_body_decodes_as_unit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
      .and(path("/test"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&mock_server)
      .await;

    let client = client_for(&mock_server);
    let result: Result<(), _> = client.patch_json("/test", &serde_json::json!({"a": 1})).await;
    assert!(result.is_ok());
  }

  #[tokio::test]
  async fn test_concurrency_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/test"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(serde_json::json!({"result": "slow"}))
          .set_delay(Duration::from_millis(100)),
      )
      .mount(&mock_server)
      .await;

    let client = ApiClient::new(ApiClientConfig {
      base_url: mock_server.uri(),
      max_concurrent_requests: 1,
      ..Default::default()
    })
    .unwrap();

    let start = Instant::now();
    let (first, second) = tokio::join!(
      client.get_json::<TestResponse>("/test"),
      client.get_json::<TestResponse>("/test")
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    // Second request waits for the first permit
    assert!(start.elapsed() >= Duration::from_millis(200));
  }
}
