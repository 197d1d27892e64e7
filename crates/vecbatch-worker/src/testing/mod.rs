//! In-memory stand-ins for the broker, the repository and the embedding provider

mod memory_repository;
mod recording_publisher;
mod static_provider;

pub use memory_repository::InMemoryRepository;
pub use recording_publisher::RecordingPublisher;
pub use static_provider::StaticEmbeddingProvider;
