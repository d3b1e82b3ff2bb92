//! Tenant-aware embedding service.
//!
//! Resolves the provider and model for a request, serves repeated texts from
//! the vector cache, collapses duplicate texts into a single provider input,
//! and validates what the provider returns before anything is cached.
//!
//! Keys that another call is already fetching are awaited rather than sent
//! again, so concurrent requests for the same text share one provider call.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::adapters::cache::VectorCache;
use crate::domain::errors::{EmbeddingError, EmbeddingResult};
use crate::domain::models::{cache_tenant, model_dimension, EmbeddingRequest, EmbeddingResponse};
use crate::domain::ports::EmbeddingProvider;
use crate::services::config_runtime::{ConfigRuntime, ConfigSnapshot};
use crate::services::normalize::l2_normalize_in_place;
use crate::services::provider_registry::ProviderRegistry;
use crate::services::tenant_registry::TenantStrategyRegistry;

/// Provider, model, and normalization chosen for one call.
struct Resolution {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    normalize: bool,
}

/// A distinct cache miss and every request position waiting on it.
struct PendingKey {
    key: String,
    text: String,
    positions: Vec<usize>,
}

/// Outcome slot for a key being fetched by some call.
type InFlightSender = watch::Sender<Option<EmbeddingResult<Vec<f32>>>>;

/// Keys this call claimed in the in-flight map; released on drop.
struct InFlightClaims<'a> {
    map: &'a DashMap<String, InFlightSender>,
    keys: Vec<String>,
}

impl InFlightClaims<'_> {
    fn settle(&self, key: &str, outcome: EmbeddingResult<Vec<f32>>) {
        if let Some(sender) = self.map.get(key) {
            sender.send_replace(Some(outcome));
        }
    }
}

impl Drop for InFlightClaims<'_> {
    fn drop(&mut self) {
        for key in &self.keys {
            self.map.remove(key);
        }
    }
}

/// Embedding orchestration over the provider registry and vector cache.
pub struct EmbeddingService {
    runtime: Arc<ConfigRuntime>,
    providers: Arc<ProviderRegistry>,
    tenants: Arc<TenantStrategyRegistry>,
    cache: Arc<VectorCache>,
    in_flight: DashMap<String, InFlightSender>,
}

impl EmbeddingService {
    /// Build a service whose cache is sized from the current configuration.
    pub fn new(
        runtime: Arc<ConfigRuntime>,
        providers: Arc<ProviderRegistry>,
        tenants: Arc<TenantStrategyRegistry>,
    ) -> EmbeddingResult<Self> {
        let snapshot = runtime.current()?;
        let cache = Arc::new(VectorCache::new(snapshot.cache_max_entries)?);
        Ok(Self::with_cache(runtime, providers, tenants, cache))
    }

    /// Build a service over an existing cache.
    pub fn with_cache(
        runtime: Arc<ConfigRuntime>,
        providers: Arc<ProviderRegistry>,
        tenants: Arc<TenantStrategyRegistry>,
        cache: Arc<VectorCache>,
    ) -> Self {
        Self {
            runtime,
            providers,
            tenants,
            cache,
            in_flight: DashMap::new(),
        }
    }

    /// Embed `request` with the default tenant.
    pub async fn embed(&self, request: &EmbeddingRequest) -> EmbeddingResult<EmbeddingResponse> {
        self.embed_for_tenant(None, request).await
    }

    /// Embed one text with the default tenant and configuration.
    pub async fn embed_one(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let request = EmbeddingRequest::single(text)?;
        let response = self.embed(&request).await?;
        response
            .vectors
            .into_iter()
            .next()
            .ok_or(EmbeddingError::Unresolved(0))
    }

    /// Embed `request` on behalf of `tenant`.
    ///
    /// Vectors come back in request order. Distinct cache misses go to the
    /// provider in one call; misses another call is already fetching are
    /// awaited and shared instead.
    #[instrument(skip(self, request), fields(inputs = request.len()))]
    pub async fn embed_for_tenant(
        &self,
        tenant: Option<&str>,
        request: &EmbeddingRequest,
    ) -> EmbeddingResult<EmbeddingResponse> {
        let snapshot = self.runtime.current()?;
        let resolution = self.resolve(&snapshot, tenant, request)?;
        let provider_name = resolution.provider.name().to_string();

        if !resolution.provider.supports(&resolution.model) {
            return Err(EmbeddingError::UnsupportedModel {
                provider: provider_name,
                model: resolution.model,
            });
        }

        let tenant_segment = cache_tenant(tenant);
        let inputs = request.inputs();
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; inputs.len()];
        let mut pending: Vec<PendingKey> = Vec::new();
        let mut pending_index: HashMap<String, usize> = HashMap::new();
        let mut hits = 0usize;

        for (position, text) in inputs.iter().enumerate() {
            let key = cache_key(
                &tenant_segment,
                &provider_name,
                &resolution.model,
                resolution.normalize,
                text,
            );

            if snapshot.cache_enabled {
                if let Some(vector) = self.cache.get(&key) {
                    slots[position] = Some(vector);
                    hits += 1;
                    continue;
                }
            }

            if let Some(&index) = pending_index.get(&key) {
                pending[index].positions.push(position);
            } else {
                pending_index.insert(key.clone(), pending.len());
                pending.push(PendingKey {
                    key,
                    text: text.clone(),
                    positions: vec![position],
                });
            }
        }

        let mut claimed: Vec<PendingKey> = Vec::new();
        let mut waiting: Vec<(PendingKey, watch::Receiver<Option<EmbeddingResult<Vec<f32>>>>)> =
            Vec::new();

        for entry in pending {
            match self.in_flight.entry(entry.key.clone()) {
                Entry::Occupied(occupied) => {
                    let receiver = occupied.get().subscribe();
                    waiting.push((entry, receiver));
                }
                Entry::Vacant(vacant) => {
                    // A concurrent call may have settled this key since the lookup above.
                    if snapshot.cache_enabled && self.cache.contains(&entry.key) {
                        if let Some(vector) = self.cache.get(&entry.key) {
                            hits += entry.positions.len();
                            fill(&mut slots, &entry.positions, vector);
                            continue;
                        }
                    }
                    vacant.insert(watch::channel(None).0);
                    claimed.push(entry);
                }
            }
        }

        debug!(
            provider = %provider_name,
            model = %resolution.model,
            hits,
            misses = inputs.len() - hits,
            distinct = claimed.len(),
            shared = waiting.len(),
            "Resolved embedding cache lookups"
        );

        let claims = InFlightClaims {
            map: &self.in_flight,
            keys: claimed.iter().map(|p| p.key.clone()).collect(),
        };

        if !claimed.is_empty() {
            let texts: Vec<String> = claimed.iter().map(|p| p.text.clone()).collect();
            match self.fetch(&resolution, &texts).await {
                Ok(vectors) => {
                    for (entry, vector) in claimed.into_iter().zip(vectors) {
                        if snapshot.cache_enabled {
                            self.cache.put(entry.key.clone(), &vector);
                        }
                        claims.settle(&entry.key, Ok(vector.clone()));
                        fill(&mut slots, &entry.positions, vector);
                    }
                }
                Err(err) => {
                    for key in &claims.keys {
                        claims.settle(key, Err(err.clone()));
                    }
                    return Err(err);
                }
            }
        }

        // Own keys are released before waiting on anyone else's.
        drop(claims);

        let mut orphaned: Vec<PendingKey> = Vec::new();
        for (entry, mut receiver) in waiting {
            let outcome = receiver
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|settled| (*settled).clone());
            match outcome {
                Some(result) => fill(&mut slots, &entry.positions, result?),
                None => orphaned.push(entry),
            }
        }

        if !orphaned.is_empty() {
            warn!(
                count = orphaned.len(),
                "Shared embedding fetch was abandoned, fetching directly"
            );
            let texts: Vec<String> = orphaned.iter().map(|p| p.text.clone()).collect();
            let vectors = self.fetch(&resolution, &texts).await?;
            for (entry, vector) in orphaned.into_iter().zip(vectors) {
                if snapshot.cache_enabled {
                    self.cache.put(entry.key, &vector);
                }
                fill(&mut slots, &entry.positions, vector);
            }
        }

        let vectors = slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| slot.ok_or(EmbeddingError::Unresolved(position)))
            .collect::<EmbeddingResult<Vec<_>>>()?;

        Ok(EmbeddingResponse::new(
            vectors,
            provider_name,
            resolution.model,
            snapshot.embedding_version.clone(),
        ))
    }

    /// Re-read the configuration, clear the cache, and resize it if needed.
    #[instrument(skip(self))]
    pub fn reload_configuration(&self) -> EmbeddingResult<Arc<ConfigSnapshot>> {
        let snapshot = self.runtime.reload()?;
        self.cache.clear();
        if self.cache.capacity() != snapshot.cache_max_entries {
            self.cache.resize(snapshot.cache_max_entries)?;
        }
        debug!(capacity = snapshot.cache_max_entries, "Vector cache cleared");
        Ok(snapshot)
    }

    /// Current configuration snapshot.
    pub fn snapshot(&self) -> EmbeddingResult<Arc<ConfigSnapshot>> {
        self.runtime.current()
    }

    /// Shared vector cache.
    pub fn cache(&self) -> &Arc<VectorCache> {
        &self.cache
    }

    /// Registered providers.
    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Explicitly registered tenant strategies.
    pub fn tenants(&self) -> &Arc<TenantStrategyRegistry> {
        &self.tenants
    }

    /// One provider call for `texts`, validated and normalized.
    async fn fetch(&self, resolution: &Resolution, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut vectors = resolution
            .provider
            .embed_all(texts, &resolution.model)
            .await?;

        validate_vectors(&vectors, texts.len(), &resolution.model)?;

        if resolution.normalize {
            for vector in &mut vectors {
                l2_normalize_in_place(vector);
            }
        }

        Ok(vectors)
    }

    fn resolve(
        &self,
        snapshot: &ConfigSnapshot,
        tenant: Option<&str>,
        request: &EmbeddingRequest,
    ) -> EmbeddingResult<Resolution> {
        // Explicit registrations take precedence over the configured table.
        let strategy = tenant.and_then(|t| {
            self.tenants
                .find(t)
                .or_else(|| snapshot.tenant_strategy(t).cloned())
        });

        let model = request
            .model()
            .or_else(|| strategy.as_ref().and_then(|s| s.model_override()))
            .unwrap_or(snapshot.default_model.as_str())
            .to_string();

        let provider = if let Some(name) = request.provider() {
            self.providers.required(name)?
        } else if let Some(name) = strategy.as_ref().and_then(|s| s.provider_override()) {
            self.providers.required(name)?
        } else if let Some(provider) = self.providers.find_by_model(&model) {
            provider
        } else {
            self.providers.required(&snapshot.default_provider)?
        };

        Ok(Resolution {
            provider,
            model,
            normalize: request.normalize().unwrap_or(snapshot.normalize),
        })
    }
}

fn fill(slots: &mut [Option<Vec<f32>>], positions: &[usize], vector: Vec<f32>) {
    if let Some((&last, rest)) = positions.split_last() {
        for &position in rest {
            slots[position] = Some(vector.clone());
        }
        slots[last] = Some(vector);
    }
}

/// Cache key for one input under a resolved configuration.
pub fn cache_key(tenant: &str, provider: &str, model: &str, normalize: bool, text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    format!("{tenant}|{provider}|{model}|{normalize}|{digest:x}")
}

/// Check count, shared dimension, and model-implied dimension.
fn validate_vectors(vectors: &[Vec<f32>], expected: usize, model: &str) -> EmbeddingResult<()> {
    if vectors.len() != expected {
        return Err(EmbeddingError::ResultCountMismatch {
            expected,
            actual: vectors.len(),
        });
    }

    let Some(dimension) = vectors.first().map(Vec::len) else {
        return Ok(());
    };

    if let Some((index, vector)) = vectors
        .iter()
        .enumerate()
        .find(|(_, v)| v.len() != dimension)
    {
        return Err(EmbeddingError::DimensionMismatch {
            index,
            expected: dimension,
            actual: vector.len(),
        });
    }

    if let Some(implied) = model_dimension(model) {
        if implied != dimension {
            return Err(EmbeddingError::ModelDimensionMismatch {
                model: model.to_string(),
                expected: implied,
                observed: dimension,
            });
        }
    }

    Ok(())
}
