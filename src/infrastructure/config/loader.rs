//! Figment-based configuration loading and validation.

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::adapters::config::{EnvFallbackConfigSource, InMemoryConfigSource};
use crate::domain::models::config::Config;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "vectorgate.yaml";

/// Prefix of environment overrides (`VECTORGATE_EMBEDDING__BATCH_SIZE=16`)
pub const ENV_PREFIX: &str = "VECTORGATE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown tracing level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Blank provider name.
    #[error("Invalid provider name: '{0}'. Must not be blank")]
    InvalidProviderName(String),

    /// Provider timeout below one second.
    #[error("Invalid timeout_secs for provider '{0}'. Must be at least 1")]
    InvalidTimeout(String),

    /// Any other invalid value.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `vectorgate.yaml` in the working directory (optional)
    /// 3. Environment variables (`VECTORGATE_*` prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_file(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Embedding tunables are not checked here; the config runtime applies
    /// defaults and bounds to them on every snapshot.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if let Some(openai) = &config.providers.openai {
            let name = openai.name.as_deref().unwrap_or("openai");
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidProviderName(name.to_string()));
            }
            if name == "hash" {
                return Err(ConfigError::ValidationFailed(
                    "provider name 'hash' is reserved for the built-in provider".to_string(),
                ));
            }
            if openai.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidTimeout(name.to_string()));
            }
        }

        Ok(())
    }

    /// Key/value source for the config runtime.
    ///
    /// The `embedding` section of `config` answers first; keys it leaves unset
    /// fall back to `EMBEDDING_*` environment variables.
    pub fn config_source(config: &Config) -> EnvFallbackConfigSource<InMemoryConfigSource> {
        let primary = InMemoryConfigSource::from_pairs(config.embedding.to_properties());
        EnvFallbackConfigSource::new(primary)
    }
}
