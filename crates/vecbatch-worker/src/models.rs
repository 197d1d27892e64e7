mod batch;
mod embeddings_metadata;
mod job;
mod messages;

pub use batch::*;
pub use embeddings_metadata::*;
pub use job::*;
pub use messages::*;
