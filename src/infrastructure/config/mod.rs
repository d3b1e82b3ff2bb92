//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Configuration validation
//! - Flattening into the key/value source read by the config runtime

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
