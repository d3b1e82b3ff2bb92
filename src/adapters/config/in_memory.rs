//! Mutable in-process config source.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::domain::ports::ConfigSource;

/// Key/value source backed by a map that can be edited at runtime.
///
/// Edits become visible to the config runtime on its next poll.
#[derive(Debug, Default)]
pub struct InMemoryConfigSource {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryConfigSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source seeded with `pairs`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Insert or replace a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Remove a value, returning the old one.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

impl ConfigSource for InMemoryConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}
