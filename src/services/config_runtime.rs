//! Hot-reloadable configuration snapshot.
//!
//! The runtime polls a [`ConfigSource`] for every embedding tunable and
//! fingerprints the raw values. A new [`ConfigSnapshot`] is built only when the
//! fingerprint changes; otherwise the published snapshot is handed out again.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::errors::{EmbeddingError, EmbeddingResult};
use crate::domain::models::{keys, parse_strategy_spec, tenant_key, TenantEmbeddingStrategy};
use crate::domain::ports::ConfigSource;

/// Provider used when nothing else selects one.
pub const DEFAULT_PROVIDER: &str = "hash";
/// Model used when nothing else selects one.
pub const DEFAULT_MODEL: &str = "hash-384";
/// Embedding version stamped on responses.
pub const DEFAULT_VERSION: &str = "v1";
/// Whether vectors are L2-normalized by default.
pub const DEFAULT_NORMALIZE: bool = true;
/// Whether the vector cache is consulted.
pub const DEFAULT_CACHE_ENABLED: bool = true;
/// Vector cache capacity.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
/// Pipeline sub-batch size.
pub const DEFAULT_BATCH_SIZE: usize = 64;
/// Pipeline queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Retries after the first pipeline attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Pipeline worker count.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Immutable view of the embedding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    /// Fallback provider name.
    pub default_provider: String,
    /// Fallback model name.
    pub default_model: String,
    /// Version stamped on every response.
    pub embedding_version: String,
    /// Default normalization flag.
    pub normalize: bool,
    /// Whether the vector cache is used.
    pub cache_enabled: bool,
    /// Vector cache capacity.
    pub cache_max_entries: usize,
    /// Texts per pipeline sub-batch.
    pub batch_size: usize,
    /// Pending pipeline jobs allowed.
    pub queue_capacity: usize,
    /// Retries after the first pipeline attempt.
    pub max_retries: u32,
    /// Pipeline worker count.
    pub worker_threads: usize,
    /// Configured strategies keyed by normalized tenant.
    pub tenant_strategies: BTreeMap<String, TenantEmbeddingStrategy>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            embedding_version: DEFAULT_VERSION.to_string(),
            normalize: DEFAULT_NORMALIZE,
            cache_enabled: DEFAULT_CACHE_ENABLED,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_retries: DEFAULT_MAX_RETRIES,
            worker_threads: DEFAULT_WORKER_THREADS,
            tenant_strategies: BTreeMap::new(),
        }
    }
}

impl ConfigSnapshot {
    /// Strategy configured for `tenant` in the tenant-strategy table.
    pub fn tenant_strategy(&self, tenant: &str) -> Option<&TenantEmbeddingStrategy> {
        let key = tenant_key(Some(tenant))?;
        self.tenant_strategies.get(&key)
    }

    /// Build a snapshot from raw values, applying defaults and bounds checks.
    fn from_values(values: &BTreeMap<&'static str, Option<String>>) -> EmbeddingResult<Self> {
        let raw = |key: &str| {
            values
                .get(key)
                .and_then(Option::as_deref)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let tenant_strategies = match raw(keys::TENANT_STRATEGIES) {
            Some(spec) => parse_strategy_spec(spec)?
                .into_iter()
                .map(|s| (s.tenant.clone(), s))
                .collect(),
            None => BTreeMap::new(),
        };

        Ok(Self {
            default_provider: raw(keys::DEFAULT_PROVIDER)
                .unwrap_or(DEFAULT_PROVIDER)
                .to_string(),
            default_model: raw(keys::DEFAULT_MODEL).unwrap_or(DEFAULT_MODEL).to_string(),
            embedding_version: raw(keys::VERSION).unwrap_or(DEFAULT_VERSION).to_string(),
            normalize: parse_bool(keys::NORMALIZE, raw(keys::NORMALIZE))?
                .unwrap_or(DEFAULT_NORMALIZE),
            cache_enabled: parse_bool(keys::CACHE_ENABLED, raw(keys::CACHE_ENABLED))?
                .unwrap_or(DEFAULT_CACHE_ENABLED),
            cache_max_entries: positive_or(
                keys::CACHE_MAX_ENTRIES,
                raw(keys::CACHE_MAX_ENTRIES),
                DEFAULT_CACHE_MAX_ENTRIES,
            )?,
            batch_size: positive_or(keys::BATCH_SIZE, raw(keys::BATCH_SIZE), DEFAULT_BATCH_SIZE)?,
            queue_capacity: positive_or(
                keys::BATCH_QUEUE_CAPACITY,
                raw(keys::BATCH_QUEUE_CAPACITY),
                DEFAULT_QUEUE_CAPACITY,
            )?,
            max_retries: non_negative_or(
                keys::BATCH_MAX_RETRIES,
                raw(keys::BATCH_MAX_RETRIES),
                DEFAULT_MAX_RETRIES,
            )?,
            worker_threads: positive_or(
                keys::BATCH_WORKER_THREADS,
                raw(keys::BATCH_WORKER_THREADS),
                DEFAULT_WORKER_THREADS,
            )?,
            tenant_strategies,
        })
    }
}

fn parse_bool(key: &str, raw: Option<&str>) -> EmbeddingResult<Option<bool>> {
    raw.map(|value| match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid_value(key, value, "a boolean")),
    })
    .transpose()
}

fn parse_int(key: &str, raw: Option<&str>) -> EmbeddingResult<Option<i64>> {
    raw.map(|value| {
        value
            .parse::<i64>()
            .map_err(|_| invalid_value(key, value, "an integer"))
    })
    .transpose()
}

/// Positive integer, or `default` when unset or not positive.
fn positive_or(key: &str, raw: Option<&str>, default: usize) -> EmbeddingResult<usize> {
    Ok(parse_int(key, raw)?
        .filter(|v| *v > 0)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default))
}

/// Non-negative integer, or `default` when unset or negative.
fn non_negative_or(key: &str, raw: Option<&str>, default: u32) -> EmbeddingResult<u32> {
    Ok(parse_int(key, raw)?
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default))
}

fn invalid_value(key: &str, value: &str, expected: &str) -> EmbeddingError {
    EmbeddingError::Validation(format!(
        "invalid value '{value}' for '{key}': expected {expected}"
    ))
}

struct Published {
    fingerprint: String,
    snapshot: Arc<ConfigSnapshot>,
}

/// Publishes the current [`ConfigSnapshot`] for a [`ConfigSource`].
pub struct ConfigRuntime {
    source: Arc<dyn ConfigSource>,
    published: RwLock<Option<Published>>,
}

impl ConfigRuntime {
    /// Runtime over `source`; nothing is read until the first call.
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            published: RwLock::new(None),
        }
    }

    /// Current snapshot, rebuilt only when the source's values changed.
    pub fn current(&self) -> EmbeddingResult<Arc<ConfigSnapshot>> {
        let (_, fingerprint) = self.observe()?;

        {
            let published = self.published.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(current) = published.as_ref() {
                if current.fingerprint == fingerprint {
                    return Ok(Arc::clone(&current.snapshot));
                }
            }
        }

        debug!("Configuration fingerprint changed, rebuilding snapshot");
        self.publish(false)
    }

    /// Rebuild and publish a snapshot regardless of the fingerprint.
    pub fn reload(&self) -> EmbeddingResult<Arc<ConfigSnapshot>> {
        let snapshot = self.publish(true)?;
        info!(
            version = %snapshot.embedding_version,
            provider = %snapshot.default_provider,
            model = %snapshot.default_model,
            "Embedding configuration reloaded"
        );
        Ok(snapshot)
    }

    fn observe(&self) -> EmbeddingResult<(BTreeMap<&'static str, Option<String>>, String)> {
        let values: BTreeMap<&'static str, Option<String>> = keys::ALL
            .iter()
            .map(|key| (*key, self.source.get(key)))
            .collect();
        let fingerprint = serde_json::to_string(&values)?;
        Ok((values, fingerprint))
    }

    /// Observes and publishes under the write lock; a published snapshot is
    /// never older than the one it replaces.
    fn publish(&self, force: bool) -> EmbeddingResult<Arc<ConfigSnapshot>> {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let (values, fingerprint) = self.observe()?;

        if !force {
            if let Some(current) = published.as_ref().filter(|p| p.fingerprint == fingerprint) {
                return Ok(Arc::clone(&current.snapshot));
            }
        }

        let snapshot = Arc::new(ConfigSnapshot::from_values(&values)?);
        *published = Some(Published {
            fingerprint,
            snapshot: Arc::clone(&snapshot),
        });
        Ok(snapshot)
    }
}
