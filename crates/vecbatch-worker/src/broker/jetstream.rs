use std::time::Duration;

use async_nats::jetstream::{self, Context, consumer, stream};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashSet;
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::{debug, info};

use super::{Delivery, QueuePublisher};
use crate::error::TransportError;

pub type DeliveryStream = BoxStream<'static, Result<JetStreamDelivery, TransportError>>;

/// Stream names may not contain subject separators or wildcards
pub fn stream_name(queue: &str) -> String {
  queue
    .chars()
    .map(|c| match c {
      '.' | '/' | '\\' | '*' | '>' | ' ' => '_',
      c => c,
    })
    .collect()
}

/// Work-queue stream whose single subject is the queue name
async fn get_or_create_queue(context: &Context, queue: &str) -> Result<stream::Stream, TransportError> {
  context
    .get_or_create_stream(stream::Config {
      name: stream_name(queue),
      subjects: vec![queue.to_string()],
      retention: stream::RetentionPolicy::WorkQueue,
      ..Default::default()
    })
    .await
    .map_err(|e| TransportError::Declare {
      queue: queue.to_string(),
      reason: e.to_string(),
    })
}

/// JetStream-backed publisher. Queues are declared once per connection.
pub struct JetStreamPublisher {
  context: Context,
  declared: DashSet<String>,
}

impl JetStreamPublisher {
  pub fn new(context: Context) -> Self {
    Self {
      context,
      declared: DashSet::new(),
    }
  }
}

#[async_trait]
impl QueuePublisher for JetStreamPublisher {
  async fn declare(&self, queue: &str) -> Result<(), TransportError> {
    if self.declared.contains(queue) {
      return Ok(());
    }
    get_or_create_queue(&self.context, queue).await?;
    self.declared.insert(queue.to_string());
    debug!(queue, "Declared queue");
    Ok(())
  }

  async fn publish(&self, queue: &str, payload: Bytes) -> Result<(), TransportError> {
    self.declare(queue).await?;

    let publish_error = |e: async_nats::jetstream::context::PublishError| TransportError::Publish {
      queue: queue.to_string(),
      reason: e.to_string(),
    };

    self
      .context
      .publish(queue.to_string(), payload)
      .await
      .map_err(publish_error)?
      .await
      .map_err(publish_error)?;
    Ok(())
  }
}

pub struct JetStreamDelivery(jetstream::Message);

#[async_trait]
impl Delivery for JetStreamDelivery {
  fn payload(&self) -> &[u8] {
    &self.0.message.payload
  }

  async fn ack(&self) -> Result<(), TransportError> {
    self
      .0
      .ack()
      .await
      .map_err(|e| TransportError::Ack(e.to_string()))
  }
}

/// Settings of the durable consumer shared by every worker instance.
///
/// A message is delivered once and never again, acknowledged or not.
/// `ack_wait` only needs to outlast the slowest batch so the server does not
/// count it as pending forever.
pub(super) fn consumer_config(durable_name: &str, ack_wait: Duration) -> consumer::pull::Config {
  consumer::pull::Config {
    durable_name: Some(durable_name.to_string()),
    ack_policy: consumer::AckPolicy::Explicit,
    ack_wait,
    max_deliver: 1,
    ..Default::default()
  }
}

/// Pull messages from the shared durable consumer on `queue`.
///
/// Each instance fetches one message per pull request, so it never holds
/// more than the one it is processing. Other instances keep pulling while it
/// works; parallelism comes from running more instances.
pub(super) async fn consume(
  context: &Context,
  queue: &str,
  durable_name: &str,
  ack_wait: Duration,
) -> Result<DeliveryStream, TransportError> {
  let stream = get_or_create_queue(context, queue).await?;

  let consumer: consumer::PullConsumer = stream
    .get_or_create_consumer(durable_name, consumer_config(durable_name, ack_wait))
    .await
    .map_err(|e| TransportError::Declare {
      queue: queue.to_string(),
      reason: e.to_string(),
    })?;

  let messages = consumer
    .stream()
    .max_messages_per_batch(1)
    .messages()
    .await
    .map_err(|e| TransportError::Consume(e.to_string()))?;

  info!(queue, consumer = durable_name, "Consuming queue");

  Ok(
    messages
      .map(|message| {
        message
          .map(JetStreamDelivery)
          .map_err(|e| TransportError::Consume(e.to_string()))
      })
      .boxed(),
  )
}
