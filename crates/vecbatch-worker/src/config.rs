use serde::{Deserialize, Serialize};

use crate::duration::HumanDuration;
use crate::error::WorkerError;

/// Broker connection and queue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
  #[serde(default = "default_broker_host")]
  pub host: String,

  #[serde(default = "default_broker_port")]
  pub port: u16,

  #[serde(default)]
  pub username: String,

  #[serde(default)]
  pub password: String,

  /// TLS is used when `port` equals this value
  #[serde(default = "default_secure_port")]
  pub secure_port: u16,

  #[serde(default = "default_consume_queue")]
  pub consume_queue: String,

  #[serde(default = "default_upload_queue")]
  pub upload_queue: String,

  /// Fixed delay between reconnect attempts and between fan-out publish attempts
  #[serde(default = "default_retry_interval")]
  pub retry_interval: HumanDuration,

  /// How long the broker waits for an acknowledgement. Must outlast the
  /// slowest batch; messages are never redelivered either way.
  #[serde(default = "default_ack_wait")]
  pub ack_wait: HumanDuration,

  /// Keepalive sent by the client to detect dead connections
  #[serde(default = "default_ping_interval")]
  pub ping_interval: HumanDuration,
}

impl BrokerConfig {
  pub fn address(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }

  pub fn use_tls(&self) -> bool {
    self.port == self.secure_port
  }
}

impl Default for BrokerConfig {
  fn default() -> Self {
    Self {
      host: default_broker_host(),
      port: default_broker_port(),
      username: String::new(),
      password: String::new(),
      secure_port: default_secure_port(),
      consume_queue: default_consume_queue(),
      upload_queue: default_upload_queue(),
      retry_interval: default_retry_interval(),
      ack_wait: default_ack_wait(),
      ping_interval: default_ping_interval(),
    }
  }
}

/// OpenAI-compatible embeddings endpoint called in-process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProviderConfig {
  /// API base URL (e.g. "https://api.openai.com/v1")
  #[serde(default = "default_api_base")]
  pub api_base: String,

  #[serde(default = "default_model")]
  pub model: String,

  /// Maximum number of chunks sent in one embeddings call
  #[serde(default = "default_max_items_per_call")]
  pub max_items_per_call: usize,

  /// Number of embedding calls allowed in flight for one batch
  #[serde(default = "default_pool_size")]
  pub pool_size: usize,

  #[serde(default = "default_max_attempts")]
  pub max_attempts: usize,

  /// First backoff delay, doubled after every failed attempt
  #[serde(default = "default_backoff_base")]
  pub backoff_base: HumanDuration,

  #[serde(default = "default_timeout")]
  pub timeout: HumanDuration,
}

impl Default for SyncProviderConfig {
  fn default() -> Self {
    Self {
      api_base: default_api_base(),
      model: default_model(),
      max_items_per_call: default_max_items_per_call(),
      pool_size: default_pool_size(),
      max_attempts: default_max_attempts(),
      backoff_base: default_backoff_base(),
      timeout: default_timeout(),
    }
  }
}

/// Fan-out to model-named queues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncProviderConfig {
  #[serde(default = "default_minibatch_size")]
  pub minibatch_size: usize,

  #[serde(default = "default_max_attempts")]
  pub max_attempts: usize,
}

impl Default for AsyncProviderConfig {
  fn default() -> Self {
    Self {
      minibatch_size: default_minibatch_size(),
      max_attempts: default_max_attempts(),
    }
  }
}

/// HTTP service storing Job and Batch records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
  #[serde(default = "default_repository_url")]
  pub base_url: String,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,

  #[serde(default = "default_timeout")]
  pub timeout: HumanDuration,
}

impl Default for RepositoryConfig {
  fn default() -> Self {
    Self {
      base_url: default_repository_url(),
      api_key: None,
      timeout: default_timeout(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
  #[serde(default)]
  pub broker: BrokerConfig,

  #[serde(default)]
  pub sync_provider: SyncProviderConfig,

  #[serde(default)]
  pub async_provider: AsyncProviderConfig,

  #[serde(default)]
  pub repository: RepositoryConfig,
}

impl WorkerConfig {
  /// Reject values that would make the worker spin or never dispatch
  pub fn validate(&self) -> Result<(), WorkerError> {
    let checks = [
      ("sync_provider.max_items_per_call", self.sync_provider.max_items_per_call),
      ("sync_provider.pool_size", self.sync_provider.pool_size),
      ("sync_provider.max_attempts", self.sync_provider.max_attempts),
      ("async_provider.minibatch_size", self.async_provider.minibatch_size),
      ("async_provider.max_attempts", self.async_provider.max_attempts),
    ];
    for (name, value) in checks {
      if value == 0 {
        return Err(WorkerError::Config(format!("{name} must be greater than zero")));
      }
    }

    for (name, queue) in [
      ("broker.consume_queue", &self.broker.consume_queue),
      ("broker.upload_queue", &self.broker.upload_queue),
    ] {
      if queue.trim().is_empty() {
        return Err(WorkerError::Config(format!("{name} must not be empty")));
      }
    }

    if self.broker.ack_wait.inner().is_zero() {
      return Err(WorkerError::Config("broker.ack_wait must be greater than zero".to_string()));
    }

    Ok(())
  }
}

fn default_broker_host() -> String {
  "localhost".to_string()
}

fn default_broker_port() -> u16 {
  4222
}

fn default_secure_port() -> u16 {
  4443
}

fn default_consume_queue() -> String {
  "batch_dispatch".to_string()
}

fn default_upload_queue() -> String {
  "vector_upload".to_string()
}

fn default_retry_interval() -> HumanDuration {
  HumanDuration::from_secs(5)
}

fn default_ack_wait() -> HumanDuration {
  HumanDuration::from_secs(30 * 60)
}

fn default_ping_interval() -> HumanDuration {
  HumanDuration::from_secs(600)
}

fn default_api_base() -> String {
  "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
  "text-embedding-3-small".to_string()
}

fn default_max_items_per_call() -> usize {
  2048
}

fn default_pool_size() -> usize {
  4
}

fn default_max_attempts() -> usize {
  5
}

fn default_backoff_base() -> HumanDuration {
  HumanDuration::from_secs(1)
}

fn default_timeout() -> HumanDuration {
  HumanDuration::from_secs(30)
}

fn default_minibatch_size() -> usize {
  32
}

fn default_repository_url() -> String {
  "http://localhost:8000".to_string()
}
