//! Key/value configuration sources polled by the config runtime.

pub mod env_fallback;
pub mod in_memory;

pub use env_fallback::EnvFallbackConfigSource;
pub use in_memory::InMemoryConfigSource;
