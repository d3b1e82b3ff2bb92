//! Configuration models: the YAML layout and the flat keys it maps to.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Flat configuration keys polled by the config runtime.
pub mod keys {
    /// Provider used when nothing else selects one.
    pub const DEFAULT_PROVIDER: &str = "embedding.default-provider";
    /// Model used when nothing else selects one.
    pub const DEFAULT_MODEL: &str = "embedding.default-model";
    /// Version stamped on responses.
    pub const VERSION: &str = "embedding.version";
    /// Default L2 normalization.
    pub const NORMALIZE: &str = "embedding.normalize";
    /// Vector cache switch.
    pub const CACHE_ENABLED: &str = "embedding.cache.enabled";
    /// Vector cache capacity.
    pub const CACHE_MAX_ENTRIES: &str = "embedding.cache.max-entries";
    /// Pipeline sub-batch size.
    pub const BATCH_SIZE: &str = "embedding.batch.size";
    /// Pipeline queue capacity.
    pub const BATCH_QUEUE_CAPACITY: &str = "embedding.batch.queue-capacity";
    /// Retries per sub-batch.
    pub const BATCH_MAX_RETRIES: &str = "embedding.batch.max-retries";
    /// Pipeline worker count.
    pub const BATCH_WORKER_THREADS: &str = "embedding.batch.worker-threads";
    /// Tenant strategy table, `tenant|provider|model` entries separated by `;`.
    pub const TENANT_STRATEGIES: &str = "embedding.tenant-strategies";

    /// Every tunable, in fingerprint order.
    pub const ALL: [&str; 11] = [
        DEFAULT_PROVIDER,
        DEFAULT_MODEL,
        VERSION,
        NORMALIZE,
        CACHE_ENABLED,
        CACHE_MAX_ENTRIES,
        BATCH_SIZE,
        BATCH_QUEUE_CAPACITY,
        BATCH_MAX_RETRIES,
        BATCH_WORKER_THREADS,
        TENANT_STRATEGIES,
    ];
}

/// Main configuration structure for vectorgate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Embedding tunables, flattened into the runtime's key/value source
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Optional remote providers registered next to the built-in `hash` one
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Remote provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProvidersConfig {
    /// OpenAI-compatible `/embeddings` endpoint; not registered when absent
    #[serde(default)]
    pub openai: Option<OpenAiSettings>,
}

/// OpenAI-compatible provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OpenAiSettings {
    /// Registration name (default `openai`)
    #[serde(default)]
    pub name: Option<String>,

    /// API key; `OPENAI_API_KEY` is used when unset
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL (default `https://api.openai.com/v1`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Accepted models; any `text-embedding-*` model when empty
    #[serde(default)]
    pub models: Vec<String>,

    /// Request timeout in seconds (default 30)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file output
    #[serde(default)]
    pub rotation: RotationPolicy,
}

/// Console log format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Log file rotation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// New file every day.
    #[default]
    Daily,
    /// New file every hour.
    Hourly,
    /// Single file.
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Embedding tunables as they appear in the YAML file.
///
/// Every field is optional; missing values are resolved by the config
/// runtime, which also applies the bounds checks. Numbers are signed so that
/// out-of-range values reach the runtime instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingSettings {
    /// Fallback provider name.
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Fallback model name.
    #[serde(default)]
    pub default_model: Option<String>,
    /// Embedding version.
    #[serde(default)]
    pub version: Option<String>,
    /// Default normalization.
    #[serde(default)]
    pub normalize: Option<bool>,
    /// Vector cache switch.
    #[serde(default)]
    pub cache_enabled: Option<bool>,
    /// Vector cache capacity.
    #[serde(default)]
    pub cache_max_entries: Option<i64>,
    /// Pipeline sub-batch size.
    #[serde(default)]
    pub batch_size: Option<i64>,
    /// Pipeline queue capacity.
    #[serde(default)]
    pub queue_capacity: Option<i64>,
    /// Retries per sub-batch.
    #[serde(default)]
    pub max_retries: Option<i64>,
    /// Pipeline worker count.
    #[serde(default)]
    pub worker_threads: Option<i64>,
    /// Tenant strategy table.
    #[serde(default)]
    pub tenant_strategies: Option<String>,
}

impl EmbeddingSettings {
    /// Flatten into `(key, value)` pairs, skipping unset fields.
    pub fn to_properties(&self) -> Vec<(String, String)> {
        let entries = [
            (keys::DEFAULT_PROVIDER, self.default_provider.clone()),
            (keys::DEFAULT_MODEL, self.default_model.clone()),
            (keys::VERSION, self.version.clone()),
            (keys::NORMALIZE, self.normalize.map(|v| v.to_string())),
            (keys::CACHE_ENABLED, self.cache_enabled.map(|v| v.to_string())),
            (keys::CACHE_MAX_ENTRIES, self.cache_max_entries.map(|v| v.to_string())),
            (keys::BATCH_SIZE, self.batch_size.map(|v| v.to_string())),
            (keys::BATCH_QUEUE_CAPACITY, self.queue_capacity.map(|v| v.to_string())),
            (keys::BATCH_MAX_RETRIES, self.max_retries.map(|v| v.to_string())),
            (keys::BATCH_WORKER_THREADS, self.worker_threads.map(|v| v.to_string())),
            (keys::TENANT_STRATEGIES, self.tenant_strategies.clone()),
        ];

        entries
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect()
    }
}
