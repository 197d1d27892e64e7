use std::sync::Arc;

use async_nats::{ConnectOptions, jetstream};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::jetstream::{DeliveryStream, JetStreamPublisher, consume};
use super::QueuePublisher;
use crate::config::BrokerConfig;
use crate::error::TransportError;

const CONSUMER_NAME: &str = "vecbatch-worker";

/// Handles for one broker connection. The consume side is read only by the
/// consumer loop; the publish side serves both outbound paths.
pub struct Channels {
  pub consume: DeliveryStream,
  pub publish: Arc<dyn QueuePublisher>,
}

/// Owns broker connection settings and (re)establishes channels
pub struct ConnectionManager {
  config: BrokerConfig,
}

impl ConnectionManager {
  pub fn new(config: BrokerConfig) -> Self {
    Self { config }
  }

  /// One connection attempt. Declares the consume and upload queues.
  pub async fn connect(&self) -> Result<Channels, TransportError> {
    let address = self.config.address();

    let mut options = ConnectOptions::new()
      .name(CONSUMER_NAME)
      .require_tls(self.config.use_tls())
      .ping_interval(self.config.ping_interval.inner());
    if !self.config.username.is_empty() {
      options = options.user_and_password(self.config.username.clone(), self.config.password.clone());
    }

    let client = options
      .connect(address.as_str())
      .await
      .map_err(|e| TransportError::Connect {
        address: address.clone(),
        reason: e.to_string(),
      })?;

    let context = jetstream::new(client);

    let publisher = JetStreamPublisher::new(context.clone());
    publisher.declare(&self.config.upload_queue).await?;

    let consume = consume(
      &context,
      &self.config.consume_queue,
      CONSUMER_NAME,
      self.config.ack_wait.inner(),
    )
    .await?;

    info!(
      address = %address,
      tls = self.config.use_tls(),
      consume_queue = %self.config.consume_queue,
      upload_queue = %self.config.upload_queue,
      "Connected to broker"
    );

    Ok(Channels {
      consume,
      publish: Arc::new(publisher),
    })
  }

  /// Retry [`connect`](Self::connect) with a fixed delay and no attempt cap.
  ///
  /// Returns `None` only once `shutdown` is cancelled.
  pub async fn connect_with_retry(&self, shutdown: &CancellationToken) -> Option<Channels> {
    let delay = self.config.retry_interval;
    let mut attempt: u64 = 0;

    loop {
      attempt += 1;
      match self.connect().await {
        Ok(channels) => return Some(channels),
        Err(e) => {
          warn!(attempt, error = %e, retry_in = %delay, "Broker connection failed");
        }
      }

      tokio::select! {
        _ = shutdown.cancelled() => {
          info!("Shutdown requested while reconnecting");
          return None;
        }
        _ = tokio::time::sleep(delay.inner()) => {}
      }
    }
  }
}
