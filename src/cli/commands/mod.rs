//! CLI command implementations

pub mod config;
pub mod embed;
pub mod providers;
