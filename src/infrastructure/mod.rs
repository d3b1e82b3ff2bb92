//! Infrastructure layer module
//!
//! Process-level concerns that sit outside the embedding core:
//! - Configuration loading (figment, YAML, environment)
//! - Logging initialization (tracing-subscriber, tracing-appender)

pub mod config;
pub mod logging;
