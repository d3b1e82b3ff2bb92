//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert text into
//! dense vector representations for semantic similarity search.

use async_trait::async_trait;

use crate::domain::errors::EmbeddingResult;

/// Trait for embedding providers (local or remote).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name used for registry lookup (e.g., "openai", "hash").
    fn name(&self) -> &str;

    /// Whether this provider can serve `model`.
    fn supports(&self, model: &str) -> bool;

    /// Embed every input with `model`.
    ///
    /// Must return exactly one vector per input, in input order. Failures
    /// should be reported as `EmbeddingError::Provider` so callers can retry.
    async fn embed_all(&self, inputs: &[String], model: &str) -> EmbeddingResult<Vec<Vec<f32>>>;
}
