//! Tenant strategy models and the strategy-spec parser.
//!
//! A strategy spec is a `;`-separated list of entries, each either
//! `tenant|provider|model` or `tenant=provider:model`.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{EmbeddingError, EmbeddingResult};

/// Tenant used in cache keys when a request carries no tenant.
pub const DEFAULT_TENANT: &str = "default";

/// Provider/model override bound to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEmbeddingStrategy {
    /// Normalized tenant identifier.
    pub tenant: String,
    /// Provider name.
    pub provider: String,
    pub model: String,
}

impl TenantEmbeddingStrategy {
    /// Build a strategy; the tenant must be non-blank and is stored normalized.
    pub fn new(
        tenant: &str,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> EmbeddingResult<Self> {
        let tenant = tenant_key(Some(tenant)).ok_or_else(|| {
            EmbeddingError::Validation("tenant identifier must not be blank".to_string())
        })?;

        Ok(Self {
            tenant,
            provider: provider.into().trim().to_string(),
            model: model.into().trim().to_string(),
        })
    }

    /// Provider override, if non-blank.
    pub fn provider_override(&self) -> Option<&str> {
        Some(self.provider.as_str()).filter(|p| !p.is_empty())
    }

    /// Model override, if non-blank.
    pub fn model_override(&self) -> Option<&str> {
        Some(self.model.as_str()).filter(|m| !m.is_empty())
    }
}

/// Registry key for a tenant: trimmed and lower-cased, `None` when blank.
pub fn tenant_key(tenant: Option<&str>) -> Option<String> {
    tenant
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Tenant segment of a cache key; blank or missing tenants share [`DEFAULT_TENANT`].
pub fn cache_tenant(tenant: Option<&str>) -> String {
    tenant_key(tenant).unwrap_or_else(|| DEFAULT_TENANT.to_string())
}

/// Parse a full strategy spec. Any malformed entry fails the whole spec.
pub fn parse_strategy_spec(spec: &str) -> EmbeddingResult<Vec<TenantEmbeddingStrategy>> {
    spec.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_strategy_entry)
        .collect()
}

fn parse_strategy_entry(entry: &str) -> EmbeddingResult<TenantEmbeddingStrategy> {
    let (tenant, provider, model) = if entry.contains('|') {
        let fields: Vec<&str> = entry.split('|').map(str::trim).collect();
        match fields.as_slice() {
            [tenant, provider, model] => (*tenant, *provider, *model),
            _ => {
                return Err(invalid_entry(
                    entry,
                    &format!("expected 3 '|'-separated fields, found {}", fields.len()),
                ))
            }
        }
    } else if let Some((tenant, target)) = entry.split_once('=') {
        let (provider, model) = target
            .split_once(':')
            .ok_or_else(|| invalid_entry(entry, "expected 'tenant=provider:model'"))?;
        (tenant.trim(), provider.trim(), model.trim())
    } else {
        return Err(invalid_entry(
            entry,
            "expected 'tenant|provider|model' or 'tenant=provider:model'",
        ));
    };

    if tenant.is_empty() {
        return Err(invalid_entry(entry, "tenant is empty"));
    }
    if provider.is_empty() {
        return Err(invalid_entry(entry, "provider is empty"));
    }
    if model.is_empty() {
        return Err(invalid_entry(entry, "model is empty"));
    }

    TenantEmbeddingStrategy::new(tenant, provider, model)
}

fn invalid_entry(entry: &str, reason: &str) -> EmbeddingError {
    EmbeddingError::Validation(format!("invalid tenant strategy entry '{entry}': {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_entry_forms() {
        let strategies =
            parse_strategy_spec("acme|openai|text-embedding-3-small; Globex=hash:hash-64;").unwrap();

        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].tenant, "acme");
        assert_eq!(strategies[0].provider, "openai");
        assert_eq!(strategies[0].model, "text-embedding-3-small");
        assert_eq!(strategies[1].tenant, "globex");
        assert_eq!(strategies[1].provider, "hash");
        assert_eq!(strategies[1].model, "hash-64");
    }

    #[test]
    fn test_parse_model_may_contain_colon() {
        let strategies = parse_strategy_spec("acme=ollama:nomic-embed:v1.5").unwrap();
        assert_eq!(strategies[0].provider, "ollama");
        assert_eq!(strategies[0].model, "nomic-embed:v1.5");
    }

    #[test]
    fn test_parse_empty_spec() {
        assert!(parse_strategy_spec("").unwrap().is_empty());
        assert!(parse_strategy_spec(" ; ;").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        let err = parse_strategy_spec("acme|openai").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("acme|openai"));
        assert!(message.contains("found 2"));
    }

    #[test]
    fn test_parse_rejects_empty_fields() {
        assert!(parse_strategy_spec("|openai|m").is_err());
        assert!(parse_strategy_spec("acme||m").is_err());
        assert!(parse_strategy_spec("acme=openai:").is_err());
        assert!(parse_strategy_spec("acme=:model").is_err());
        assert!(parse_strategy_spec("acme=openai").is_err());
        assert!(parse_strategy_spec("just-a-tenant").is_err());
    }

    #[test]
    fn test_one_bad_entry_fails_whole_spec() {
        let result = parse_strategy_spec("acme|openai|m;bad-entry;globex|hash|hash-8");
        assert!(matches!(result, Err(EmbeddingError::Validation(msg)) if msg.contains("bad-entry")));
    }

    #[test]
    fn test_tenant_key_normalization() {
        assert_eq!(tenant_key(Some("  Acme ")), Some("acme".to_string()));
        assert_eq!(tenant_key(Some("   ")), None);
        assert_eq!(tenant_key(None), None);
        assert_eq!(cache_tenant(None), "default");
        assert_eq!(cache_tenant(Some("")), "default");
        assert_eq!(cache_tenant(Some("ACME")), "acme");
    }

    #[test]
    fn test_strategy_overrides_skip_blank_fields() {
        let strategy = TenantEmbeddingStrategy::new("acme", "openai", " ").unwrap();
        assert_eq!(strategy.provider_override(), Some("openai"));
        assert_eq!(strategy.model_override(), None);
        assert!(TenantEmbeddingStrategy::new(" ", "p", "m").is_err());
    }
}
