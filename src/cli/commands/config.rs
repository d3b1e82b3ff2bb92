//! Implementation of the `vectorgate config` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::service::build_service;
use crate::domain::models::Config;
use crate::services::ConfigSnapshot;

/// Effective configuration snapshot.
#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    /// Snapshot as resolved by the config runtime.
    #[serde(flatten)]
    pub snapshot: ConfigSnapshot,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        let s = &self.snapshot;
        let mut lines = vec![
            format!("default provider:  {}", s.default_provider),
            format!("default model:     {}", s.default_model),
            format!("version:           {}", s.embedding_version),
            format!("normalize:         {}", s.normalize),
            format!("cache enabled:     {}", s.cache_enabled),
            format!("cache max entries: {}", s.cache_max_entries),
            format!("batch size:        {}", s.batch_size),
            format!("queue capacity:    {}", s.queue_capacity),
            format!("max retries:       {}", s.max_retries),
            format!("worker threads:    {}", s.worker_threads),
        ];
        if s.tenant_strategies.is_empty() {
            lines.push("tenant strategies: none".to_string());
        } else {
            lines.push("tenant strategies:".to_string());
            for strategy in s.tenant_strategies.values() {
                lines.push(format!(
                    "  - {} -> {}:{}",
                    strategy.tenant, strategy.provider, strategy.model
                ));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print the effective embedding configuration.
pub async fn execute(config: &Config, json_mode: bool) -> Result<()> {
    let service = build_service(config)?;
    let snapshot = service.snapshot()?;
    output(
        &ConfigOutput {
            snapshot: (*snapshot).clone(),
        },
        json_mode,
    );
    Ok(())
}
