//! Concurrent per-tenant strategy registry.

use std::collections::BTreeMap;

use dashmap::DashMap;
use tracing::info;

use crate::domain::errors::EmbeddingResult;
use crate::domain::models::{parse_strategy_spec, tenant_key, TenantEmbeddingStrategy};

/// Tenant → (provider, model) overrides, safe for concurrent use.
///
/// Keys are trimmed and lower-cased; a re-registration replaces the whole
/// strategy.
#[derive(Debug, Default)]
pub struct TenantStrategyRegistry {
    strategies: DashMap<String, TenantEmbeddingStrategy>,
}

impl TenantStrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the strategy for `tenant`.
    pub fn register(
        &self,
        tenant: &str,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> EmbeddingResult<TenantEmbeddingStrategy> {
        let strategy = TenantEmbeddingStrategy::new(tenant, provider, model)?;
        self.strategies
            .insert(strategy.tenant.clone(), strategy.clone());
        Ok(strategy)
    }

    /// Strategy for `tenant`; blank tenants never match.
    pub fn find(&self, tenant: &str) -> Option<TenantEmbeddingStrategy> {
        let key = tenant_key(Some(tenant))?;
        self.strategies.get(&key).map(|entry| entry.value().clone())
    }

    /// Drop the strategy for `tenant`.
    pub fn remove(&self, tenant: &str) -> Option<TenantEmbeddingStrategy> {
        let key = tenant_key(Some(tenant))?;
        self.strategies.remove(&key).map(|(_, strategy)| strategy)
    }

    /// Sorted copy of every registered strategy.
    pub fn snapshot(&self) -> BTreeMap<String, TenantEmbeddingStrategy> {
        self.strategies
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Parse and register every entry of `spec`.
    ///
    /// Nothing is registered unless the whole spec parses. Existing entries
    /// for other tenants are kept. Returns the number of entries applied.
    pub fn load_spec(&self, spec: &str) -> EmbeddingResult<usize> {
        let parsed = parse_strategy_spec(spec)?;
        let count = parsed.len();
        for strategy in parsed {
            self.strategies.insert(strategy.tenant.clone(), strategy);
        }
        info!(count, "Loaded tenant embedding strategies");
        Ok(count)
    }

    /// Registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no strategy is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
