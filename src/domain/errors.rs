//! Domain errors for the vectorgate embedding pipeline.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while resolving, computing, or scheduling embeddings.
///
/// Cloneable so one provider failure can be handed to every caller that was
/// waiting on the same input.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Malformed request or input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No provider registered under this name.
    #[error("Embedding provider not found: {0}")]
    ProviderNotFound(String),

    /// The resolved provider cannot serve the resolved model.
    #[error("Provider '{provider}' does not support model '{model}'")]
    UnsupportedModel {
        /// Provider name.
        provider: String,
        /// Requested model.
        model: String,
    },

    /// The provider call itself failed.
    #[error("Provider '{provider}' failed: {message}")]
    Provider {
        /// Provider name.
        provider: String,
        /// Failure detail reported by the provider.
        message: String,
    },

    /// The provider returned the wrong number of vectors.
    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    ResultCountMismatch {
        /// Inputs sent.
        expected: usize,
        /// Vectors returned.
        actual: usize,
    },

    /// Vectors within one provider response differ in length.
    #[error("Embedding dimension mismatch at index {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Position of the first offending vector.
        index: usize,
        /// Length of the first vector.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// Vectors do not match the dimension the model name implies.
    #[error("Model '{model}' expects dimension {expected} but provider returned {observed}")]
    ModelDimensionMismatch {
        /// Model name.
        model: String,
        /// Dimension implied by the model name.
        expected: usize,
        /// Dimension the provider returned.
        observed: usize,
    },

    /// Sub-batches of one pipeline job returned different dimensions.
    #[error("Sub-batch dimension mismatch: expected {expected}, got {actual}")]
    BatchDimensionMismatch {
        /// Dimension of the first sub-batch.
        expected: usize,
        /// Dimension of the offending sub-batch.
        actual: usize,
    },

    /// A request position ended up without a vector.
    #[error("No embedding resolved for input at position {0}")]
    Unresolved(usize),

    /// A job produced no vectors at all.
    #[error("No embeddings generated")]
    NoEmbeddings,

    /// Every retry attempt failed.
    #[error("Embedding failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error from the last attempt.
        #[source]
        source: Box<EmbeddingError>,
    },

    /// The pipeline no longer accepts jobs.
    #[error("Embedding pipeline is closed")]
    PipelineClosed,

    /// The pipeline queue is full.
    #[error("Embedding pipeline is busy: queue capacity {capacity} reached")]
    PipelineBusy {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The caller stopped waiting.
    #[error("Timed out after {0:?} waiting for embeddings")]
    Timeout(Duration),

    /// The job was dropped before it finished.
    #[error("Embedding job was interrupted before completion")]
    Interrupted,
}

/// Result alias for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

impl EmbeddingError {
    /// Shorthand for a provider failure attributed to `provider`.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether another attempt could succeed.
    ///
    /// Only provider/runtime failures qualify. Validation, resolution, and
    /// consistency failures are deterministic for a given input.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }

    /// Whether the failure is a provider contract violation.
    pub const fn is_consistency_error(&self) -> bool {
        matches!(
            self,
            Self::ResultCountMismatch { .. }
                | Self::DimensionMismatch { .. }
                | Self::ModelDimensionMismatch { .. }
                | Self::BatchDimensionMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for EmbeddingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
