//! Wiring of the embedding service for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::embeddings::{HashEmbeddingProvider, OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use crate::domain::models::Config;
use crate::domain::ports::EmbeddingProvider;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{ConfigRuntime, EmbeddingService, ProviderRegistry, TenantStrategyRegistry};

/// Providers enabled by `config`: the built-in `hash` provider first, then
/// the OpenAI-compatible one when configured.
pub fn build_providers(config: &Config) -> Result<ProviderRegistry> {
    let mut providers: Vec<Arc<dyn EmbeddingProvider>> = vec![Arc::new(HashEmbeddingProvider::new())];

    if let Some(settings) = &config.providers.openai {
        let provider = OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig::from(settings))
            .context("Failed to create OpenAI embedding provider")?;
        providers.push(Arc::new(provider));
    }

    ProviderRegistry::new(providers).context("Failed to register embedding providers")
}

/// Build the embedding service described by `config`.
pub fn build_service(config: &Config) -> Result<Arc<EmbeddingService>> {
    let providers = Arc::new(build_providers(config)?);
    let runtime = Arc::new(ConfigRuntime::new(Arc::new(ConfigLoader::config_source(config))));
    let tenants = Arc::new(TenantStrategyRegistry::new());

    let service = EmbeddingService::new(runtime, providers, tenants)
        .context("Failed to initialize embedding service")?;

    info!(providers = ?service.providers().names(), "Embedding service ready");
    Ok(Arc::new(service))
}
