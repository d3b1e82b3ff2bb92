//! Embedding provider adapters.

pub mod hash;
pub mod openai;

pub use hash::HashEmbeddingProvider;
pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
