//! In-process caching for computed embeddings.

pub mod vector_cache;

pub use vector_cache::{CacheStats, VectorCache};
