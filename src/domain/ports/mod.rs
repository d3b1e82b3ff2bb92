//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that adapters must implement:
//! - EmbeddingProvider: turns a batch of texts into vectors for a named model
//! - ConfigSource: flat key/value store polled for embedding tunables
//!
//! These traits keep the services independent of concrete model backends
//! and configuration stores.

pub mod config_source;
pub mod embedding;

pub use config_source::ConfigSource;
pub use embedding::EmbeddingProvider;
