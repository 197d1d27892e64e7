use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use crate::broker::QueuePublisher;
use crate::error::TransportError;

/// Publisher that keeps every accepted message and can be told to fail
#[derive(Default)]
pub struct RecordingPublisher {
  published: Mutex<Vec<(String, Bytes)>>,
  declared: Mutex<Vec<String>>,
  attempts: AtomicUsize,
  fail_next: AtomicUsize,
  fail_all: AtomicBool,
}

impl RecordingPublisher {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reject the next `n` publish attempts
  pub fn fail_next(&self, n: usize) {
    self.fail_next.store(n, Ordering::SeqCst);
  }

  pub fn fail_all(&self, fail: bool) {
    self.fail_all.store(fail, Ordering::SeqCst);
  }

  /// Publish calls seen, including rejected ones
  pub fn attempts(&self) -> usize {
    self.attempts.load(Ordering::SeqCst)
  }

  /// Queues declared so far, in declaration order
  pub fn declared(&self) -> Vec<String> {
    self.declared.lock().map(|d| d.clone()).unwrap_or_default()
  }

  /// Accepted payloads for `queue`, decoded as JSON
  pub fn published_to(&self, queue: &str) -> Vec<serde_json::Value> {
    self
      .published
      .lock()
      .map(|published| {
        published
          .iter()
          .filter(|(q, _)| q == queue)
          .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
          .collect()
      })
      .unwrap_or_default()
  }

  pub fn published_count(&self) -> usize {
    self.published.lock().map(|p| p.len()).unwrap_or_default()
  }
}

#[async_trait]
impl QueuePublisher for RecordingPublisher {
  async fn declare(&self, queue: &str) -> Result<(), TransportError> {
    if let Ok(mut declared) = self.declared.lock() {
      if !declared.iter().any(|q| q == queue) {
        declared.push(queue.to_string());
      }
    }
    Ok(())
  }

  async fn publish(&self, queue: &str, payload: Bytes) -> Result<(), TransportError> {
    self.attempts.fetch_add(1, Ordering::SeqCst);

    let fail_once = self
      .fail_next
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok();
    if fail_once || self.fail_all.load(Ordering::SeqCst) {
      return Err(TransportError::Publish {
        queue: queue.to_string(),
        reason: "broker rejected message".to_string(),
      });
    }

    if let Ok(mut published) = self.published.lock() {
      published.push((queue.to_string(), payload));
    }
    Ok(())
  }
}
