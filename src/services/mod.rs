//! Application services: configuration runtime, embedding orchestration,
//! and the batching pipeline.

pub mod batch_pipeline;
pub mod config_runtime;
pub mod embedding_service;
pub mod normalize;
pub mod provider_registry;
pub mod retry;
pub mod tenant_registry;

pub use batch_pipeline::{BatchPipeline, BatchPipelineConfig, PendingEmbedding, PipelineStats};
pub use config_runtime::{ConfigRuntime, ConfigSnapshot};
pub use embedding_service::EmbeddingService;
pub use provider_registry::ProviderRegistry;
pub use retry::RetryPolicy;
pub use tenant_registry::TenantStrategyRegistry;
