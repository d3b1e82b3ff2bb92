//! OpenAI embedding provider adapter.
//!
//! Talks to the `/embeddings` endpoint of OpenAI or any compatible server
//! (Azure OpenAI, local gateways). One `embed_all` call is one HTTP request;
//! batching is the caller's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::{EmbeddingError, EmbeddingResult};
use crate::domain::models::OpenAiSettings;
use crate::domain::ports::EmbeddingProvider;

/// Configuration for the OpenAI embedding provider.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// Name the provider is registered under. Default: `openai`.
    pub name: String,
    /// API key. Falls back to `OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    /// Base URL for the API. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Models accepted by `supports`. Empty means any `text-embedding-*` model.
    pub models: Vec<String>,
    /// Request timeout in seconds. Default: 30.
    pub timeout_secs: u64,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            models: Vec::new(),
            timeout_secs: 30,
        }
    }
}

impl From<&OpenAiSettings> for OpenAiEmbeddingConfig {
    fn from(settings: &OpenAiSettings) -> Self {
        let defaults = Self::default();
        Self {
            name: settings.name.clone().unwrap_or(defaults.name),
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone().unwrap_or(defaults.base_url),
            models: settings.models.clone(),
            timeout_secs: settings.timeout_secs.unwrap_or(defaults.timeout_secs),
        }
    }
}

impl OpenAiEmbeddingConfig {
    fn get_api_key(&self) -> EmbeddingResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                EmbeddingError::Config(
                    "OpenAI API key not set. Set OPENAI_API_KEY env var or configure api_key."
                        .to_string(),
                )
            })
    }
}

/// OpenAI embedding provider.
pub struct OpenAiEmbeddingProvider {
    config: OpenAiEmbeddingConfig,
    client: Arc<reqwest::Client>,
}

impl OpenAiEmbeddingProvider {
    /// Build the HTTP client for `config`.
    pub fn new(config: OpenAiEmbeddingConfig) -> EmbeddingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client: Arc::new(client),
        })
    }

    async fn call_embeddings_api(
        &self,
        texts: &[String],
        model: &str,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let api_key = self.config.get_api_key()?;
        let url = format!("{}/embeddings", self.config.base_url.trim_end_matches('/'));

        let request_body = EmbeddingsRequest { model, input: texts };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.failure(format!("Embedding API request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(self.failure(format!("Embedding API returned {status}: {body}")));
        }

        let result: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| self.failure(format!("Failed to parse embedding response: {e}")))?;

        // Sort by index to maintain input order
        let mut data = result.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn failure(&self, message: String) -> EmbeddingError {
        EmbeddingError::provider(&self.config.name, message)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supports(&self, model: &str) -> bool {
        if self.config.models.is_empty() {
            model.starts_with("text-embedding-")
        } else {
            self.config.models.iter().any(|m| m == model)
        }
    }

    async fn embed_all(&self, inputs: &[String], model: &str) -> EmbeddingResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        self.call_embeddings_api(inputs, model).await
    }
}

// -- OpenAI API request/response types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
