use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

mod connection;
mod jetstream;

pub use connection::{Channels, ConnectionManager};
pub use jetstream::{DeliveryStream, JetStreamDelivery, JetStreamPublisher, stream_name};

/// Publish side of the broker connection
#[async_trait]
pub trait QueuePublisher: Send + Sync {
  /// Create `queue` if it does not exist yet
  async fn declare(&self, queue: &str) -> Result<(), TransportError>;

  /// Publish one message and wait for the broker to accept it
  async fn publish(&self, queue: &str, payload: Bytes) -> Result<(), TransportError>;
}

/// A received message that must be acknowledged exactly once
#[async_trait]
pub trait Delivery: Send + Sync {
  fn payload(&self) -> &[u8];

  async fn ack(&self) -> Result<(), TransportError>;
}
