//! Registry of embedding providers.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::errors::{EmbeddingError, EmbeddingResult};
use crate::domain::ports::EmbeddingProvider;

/// Providers available to the embedding service, in registration order.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn EmbeddingProvider>>,
}

impl ProviderRegistry {
    /// Build a registry. Fails on an empty list or duplicate names.
    pub fn new(providers: Vec<Arc<dyn EmbeddingProvider>>) -> EmbeddingResult<Self> {
        if providers.is_empty() {
            return Err(EmbeddingError::Validation(
                "at least one embedding provider must be registered".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.name()) {
                return Err(EmbeddingError::Validation(format!(
                    "duplicate embedding provider name '{}'",
                    provider.name()
                )));
            }
        }

        Ok(Self { providers })
    }

    /// Provider registered as `name`.
    pub fn find(&self, name: &str) -> Option<Arc<dyn EmbeddingProvider>> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Provider registered as `name`, or [`EmbeddingError::ProviderNotFound`].
    pub fn required(&self, name: &str) -> EmbeddingResult<Arc<dyn EmbeddingProvider>> {
        self.find(name)
            .ok_or_else(|| EmbeddingError::ProviderNotFound(name.to_string()))
    }

    /// First provider, in registration order, that supports `model`.
    pub fn find_by_model(&self, model: &str) -> Option<Arc<dyn EmbeddingProvider>> {
        self.providers
            .iter()
            .find(|p| p.supports(model))
            .cloned()
    }

    /// All provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|p| p.name().to_string()).collect();
        names.sort();
        names
    }

    /// Registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
