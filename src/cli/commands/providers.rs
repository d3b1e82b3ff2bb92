//! Implementation of the `vectorgate providers` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::service::build_service;
use crate::domain::models::Config;

/// One registered provider.
#[derive(Debug, Serialize)]
pub struct ProviderEntry {
    /// Registry name.
    pub name: String,
    /// Whether it is the configured default.
    pub is_default: bool,
}

/// Registered providers.
#[derive(Debug, Serialize)]
pub struct ProvidersOutput {
    /// Providers in registration order.
    pub providers: Vec<ProviderEntry>,
}

impl CommandOutput for ProvidersOutput {
    fn to_human(&self) -> String {
        self.providers
            .iter()
            .map(|p| {
                if p.is_default {
                    format!("{} (default)", p.name)
                } else {
                    p.name.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// List the providers built from the configuration.
pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let service = build_service(config)?;
    let snapshot = service.snapshot()?;

    let providers = service
        .providers()
        .names()
        .into_iter()
        .map(|name| ProviderEntry {
            is_default: name == snapshot.default_provider,
            name,
        })
        .collect();

    output(&ProvidersOutput { providers }, json_mode);
    Ok(())
}
