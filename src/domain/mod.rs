//! Domain layer for the vectorgate embedding pipeline
//!
//! This module contains the request/response models, tenant strategies,
//! configuration models, and the ports adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{EmbeddingError, EmbeddingResult};
