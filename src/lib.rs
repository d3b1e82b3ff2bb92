//! vectorgate - tenant-aware embedding batching and caching
//!
//! vectorgate sits between callers and embedding providers. It resolves a
//! provider and model per tenant, serves repeated texts from a bounded LRU
//! cache, collapses duplicates within a request, and offers an asynchronous
//! pipeline with a bounded queue, a worker pool, and per-sub-batch retries.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Request/response models, errors, and ports
//! - **Adapters** (`adapters`): Providers, config sources, and the vector cache
//! - **Service Layer** (`services`): Resolution, caching, batching, and config runtime
//! - **Infrastructure Layer** (`infrastructure`): Config loading and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vectorgate::adapters::config::InMemoryConfigSource;
//! use vectorgate::adapters::embeddings::HashEmbeddingProvider;
//! use vectorgate::services::{ConfigRuntime, EmbeddingService, ProviderRegistry, TenantStrategyRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Arc::new(ConfigRuntime::new(Arc::new(InMemoryConfigSource::new())));
//!     let providers = Arc::new(ProviderRegistry::new(vec![Arc::new(HashEmbeddingProvider::new())])?);
//!     let service = EmbeddingService::new(runtime, providers, Arc::new(TenantStrategyRegistry::new()))?;
//!     let vector = service.embed_one("hello").await?;
//!     assert_eq!(vector.len(), 384);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, EmbeddingRequest, EmbeddingResponse, LoggingConfig, TenantEmbeddingStrategy,
};
pub use domain::ports::{ConfigSource, EmbeddingProvider};
pub use domain::{EmbeddingError, EmbeddingResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BatchPipeline, BatchPipelineConfig, ConfigRuntime, ConfigSnapshot, EmbeddingService,
    ProviderRegistry, TenantStrategyRegistry,
};
