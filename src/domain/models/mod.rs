//! Request, response, tenant, and configuration models.

pub mod config;
pub mod embedding;
pub mod tenant;

pub use config::{
    keys, Config, EmbeddingSettings, LogFormat, LoggingConfig, OpenAiSettings, ProvidersConfig,
    RotationPolicy,
};
pub use embedding::{model_dimension, EmbeddingRequest, EmbeddingResponse};
pub use tenant::{
    cache_tenant, parse_strategy_spec, tenant_key, TenantEmbeddingStrategy, DEFAULT_TENANT,
};
