//! Message-driven embedding worker.
//!
//! A [`Worker`] consumes batch dispatch messages from the broker, chunks the
//! batch text, embeds it either in-process through an [`EmbeddingProvider`]
//! or by fanning groups out to model queues, and publishes finished
//! embeddings to the upload queue.

pub mod broker;
mod config;
pub mod consumer;
pub mod dispatch;
mod duration;
pub mod embeddings;
mod error;
pub mod models;
pub mod processor;
pub mod publisher;
pub mod reqwestx;
pub mod repository;
pub mod retry;
pub mod state;
mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::*;
pub use duration::HumanDuration;
pub use embeddings::{EmbeddingError, EmbeddingProvider};
pub use error::{DispatchError, MalformedMessage, PersistenceError, TransportError, WorkerError};
pub use processor::{BatchOutcome, BatchProcessor};
pub use worker::Worker;
