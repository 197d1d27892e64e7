use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::{FutureExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broker::Delivery;
use crate::error::{TransportError, WorkerError};
use crate::processor::BatchOutcome;

#[async_trait]
pub trait MessageHandler: Send + Sync {
  async fn handle(&self, payload: &[u8]) -> Result<BatchOutcome, WorkerError>;
}

/// Receives one message at a time, runs it to completion and acknowledges it.
///
/// Acknowledgement is unconditional: failed, malformed and panicking messages
/// are removed from the queue like successful ones. There is no broker
/// redelivery and no dead-letter queue; retries happen by resubmitting the
/// batch, which bumps its `retry_count`.
pub struct ConsumerLoop<H> {
  handler: H,
}

impl<H: MessageHandler> ConsumerLoop<H> {
  pub fn new(handler: H) -> Self {
    Self { handler }
  }

  /// Returns `Ok` on shutdown and `Err` when the connection must be rebuilt
  pub async fn run<S, D>(&self, mut messages: S, shutdown: &CancellationToken) -> Result<(), TransportError>
  where
    S: Stream<Item = Result<D, TransportError>> + Unpin,
    D: Delivery,
  {
    info!("Waiting for messages");

    loop {
      let next = tokio::select! {
        _ = shutdown.cancelled() => {
          info!("Consumer loop shutting down");
          return Ok(());
        }
        next = messages.next() => next,
      };

      let delivery = match next {
        Some(Ok(delivery)) => delivery,
        Some(Err(e)) => return Err(e),
        None => return Err(TransportError::ConsumerClosed),
      };

      self.process(delivery.payload()).await;
      delivery.ack().await?;
    }
  }

  async fn process(&self, payload: &[u8]) {
    match AssertUnwindSafe(self.handler.handle(payload)).catch_unwind().await {
      Ok(Ok(outcome)) => info!(?outcome, "Message processed"),
      Ok(Err(e)) => warn!(error = %e, "Message dropped after failure"),
      Err(panic) => {
        let reason = panic
          .downcast_ref::<&str>()
          .map(|s| s.to_string())
          .or_else(|| panic.downcast_ref::<String>().cloned())
          .unwrap_or_else(|| "unknown panic".to_string());
        error!(reason = %reason, "Message handler panicked");
      }
    }
  }
}
