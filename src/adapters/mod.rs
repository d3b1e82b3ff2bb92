//! Adapters for the embedding ports: providers, config sources, and the cache.

pub mod cache;
pub mod config;
pub mod embeddings;
