use std::collections::HashMap;
use std::path::{Path, PathBuf};

use vecbatch_worker::WorkerConfig;

const ENV_PREFIX: &str = "VECBATCH";
const ENV_SEPARATOR: &str = "__";

/// Get the default config directory path
pub fn default_config_dir() -> anyhow::Result<PathBuf> {
  let config_dir = dirs::preference_dir()
    .ok_or_else(|| anyhow::anyhow!("Could not determine preferences directory"))?
    .join(env!("CARGO_PKG_NAME"));
  Ok(config_dir)
}

/// Get the default config file path
pub fn default_config_path() -> anyhow::Result<PathBuf> {
  Ok(default_config_dir()?.join("config.toml"))
}

/// Load configuration from `path` (or the default location when it exists),
/// overridden by `VECBATCH__SECTION__KEY` environment variables.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<WorkerConfig> {
  load_layered(path, None)
}

fn load_layered(path: Option<&Path>, env: Option<HashMap<String, String>>) -> anyhow::Result<WorkerConfig> {
  let mut builder = config::Config::builder();

  match path {
    Some(path) => {
      builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }
    None => {
      if let Ok(default_path) = default_config_path() {
        builder = builder.add_source(
          config::File::from(default_path)
            .format(config::FileFormat::Toml)
            .required(false),
        );
      }
    }
  }

  let environment = config::Environment::with_prefix(ENV_PREFIX)
    .prefix_separator(ENV_SEPARATOR)
    .separator(ENV_SEPARATOR)
    .try_parsing(true)
    .source(env);

  let config: WorkerConfig = builder.add_source(environment).build()?.try_deserialize()?;
  config.validate()?;
  Ok(config)
}

/// Default configuration with explanatory comments
pub fn generate_commented_config() -> String {
  let defaults = WorkerConfig::default();
  let broker = &defaults.broker;
  let sync = &defaults.sync_provider;
  let fan_out = &defaults.async_provider;
  let repository = &defaults.repository;

  format!(
    r#"# vecbatch worker configuration
#
# Every value can be overridden with an environment variable named
# VECBATCH__<SECTION>__<KEY>, e.g. VECBATCH__BROKER__HOST=mq.internal
# Environment variables take precedence over this file.

[broker]
# Broker host and port
host = "{host}"
port = {port}

# Credentials; leave empty to connect anonymously
username = ""
password = ""

# TLS is used when `port` equals this value
secure_port = {secure_port}

# Queue carrying batch dispatch messages
consume_queue = "{consume_queue}"

# Queue receiving finished embeddings
upload_queue = "{upload_queue}"

# Fixed delay between reconnect attempts and between fan-out publish attempts
retry_interval = "{retry_interval}"

# How long the broker waits for an acknowledgement before giving up on a
# message. Messages are never redelivered; set this above the slowest batch.
ack_wait = "{ack_wait}"

# Keepalive interval for the broker connection
ping_interval = "{ping_interval}"

[sync_provider]
# OpenAI-compatible embeddings endpoint. The API key arrives with each message.
api_base = "{api_base}"
model = "{model}"

# Maximum number of chunks sent in one embeddings request
max_items_per_call = {max_items_per_call}

# Embedding requests in flight per batch
pool_size = {pool_size}

# Attempts per request; the delay doubles from `backoff_base` after each failure
max_attempts = {sync_attempts}
backoff_base = "{backoff_base}"
timeout = "{sync_timeout}"

[async_provider]
# Chunks per fan-out message
minibatch_size = {minibatch_size}

# Publish attempts per message, spaced by broker.retry_interval
max_attempts = {fan_out_attempts}

[repository]
# Service storing job and batch records
base_url = "{base_url}"
# api_key = ""
timeout = "{repository_timeout}"
"#,
    host = broker.host,
    port = broker.port,
    secure_port = broker.secure_port,
    consume_queue = broker.consume_queue,
    upload_queue = broker.upload_queue,
    retry_interval = broker.retry_interval,
    ack_wait = broker.ack_wait,
    ping_interval = broker.ping_interval,
    api_base = sync.api_base,
    model = sync.model,
    max_items_per_call = sync.max_items_per_call,
    pool_size = sync.pool_size,
    sync_attempts = sync.max_attempts,
    backoff_base = sync.backoff_base,
    sync_timeout = sync.timeout,
    minibatch_size = fan_out.minibatch_size,
    fan_out_attempts = fan_out.max_attempts,
    base_url = repository.base_url,
    repository_timeout = repository.timeout,
  )
}
