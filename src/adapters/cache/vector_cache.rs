//! Bounded LRU vector cache.
//!
//! Access-order eviction: `get` promotes the entry to most-recently-used.
//! One mutex guards the map and counters; vectors are copied in and out so
//! no caller ever holds a reference into the cache.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use lru::LruCache;
use serde::Serialize;

use crate::domain::errors::{EmbeddingError, EmbeddingResult};

/// Hit/miss counters and occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found a vector.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Vectors currently stored.
    pub entries: usize,
    /// Maximum vectors stored.
    pub capacity: usize,
}

struct Inner {
    entries: LruCache<String, Vec<f32>>,
    hits: u64,
    misses: u64,
}

/// Thread-safe LRU map from cache key to vector.
pub struct VectorCache {
    inner: Mutex<Inner>,
}

impl VectorCache {
    /// Create a cache holding at most `max_entries` vectors.
    pub fn new(max_entries: usize) -> EmbeddingResult<Self> {
        let capacity = non_zero_capacity(max_entries)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        })
    }

    /// Copy of the cached vector, promoting the entry to most-recently-used.
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut inner = self.lock();
        let found = inner.entries.get(key).cloned();
        if found.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        found
    }

    /// Store a copy of `vector`, evicting the least-recently-used entry when full.
    pub fn put(&self, key: impl Into<String>, vector: &[f32]) {
        self.lock().entries.put(key.into(), vector.to_vec());
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Change the capacity, evicting least-recently-used entries if it shrinks.
    pub fn resize(&self, max_entries: usize) -> EmbeddingResult<()> {
        let capacity = non_zero_capacity(max_entries)?;
        self.lock().entries.resize(capacity);
        Ok(())
    }

    /// Whether `key` is stored, without touching recency or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains(key)
    }

    /// Vectors currently stored.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum vectors stored.
    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    /// Current counters and occupancy.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
            capacity: inner.entries.cap().get(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn non_zero_capacity(max_entries: usize) -> EmbeddingResult<NonZeroUsize> {
    NonZeroUsize::new(max_entries).ok_or_else(|| {
        EmbeddingError::Validation("vector cache capacity must be greater than 0".to_string())
    })
}
