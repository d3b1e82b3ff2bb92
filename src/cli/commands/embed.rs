//! Implementation of the `vectorgate embed` command.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, preview_vector, truncate, CommandOutput};
use crate::cli::service::build_service;
use crate::domain::models::{Config, EmbeddingRequest, EmbeddingResponse};
use crate::services::BatchPipeline;

/// Arguments for `vectorgate embed`.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Texts to embed
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Tenant whose strategy applies
    #[arg(short, long)]
    pub tenant: Option<String>,

    /// Model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Provider override
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Skip L2 normalization
    #[arg(long)]
    pub no_normalize: bool,

    /// Submit one job per text through the batching pipeline
    #[arg(long)]
    pub pipeline: bool,

    /// Seconds to wait for each pipelined job
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,
}

impl EmbedArgs {
    fn request_for<I, S>(&self, texts: I) -> Result<EmbeddingRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut request = EmbeddingRequest::new(texts).context("Invalid embedding request")?;
        if let Some(model) = &self.model {
            request = request.with_model(model.as_str());
        }
        if let Some(provider) = &self.provider {
            request = request.with_provider(provider.as_str());
        }
        if self.no_normalize {
            request = request.with_normalize(false);
        }
        Ok(request)
    }
}

/// Vectors for the submitted texts.
#[derive(Debug, Serialize)]
pub struct EmbedOutput {
    /// Texts in submission order.
    pub texts: Vec<String>,
    /// Response returned by the pipeline.
    #[serde(flatten)]
    pub response: EmbeddingResponse,
}

impl CommandOutput for EmbedOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "{} vector(s) from {}/{} (dimension {}, version {})",
            self.response.len(),
            self.response.provider,
            self.response.model,
            self.response.dimension,
            self.response.embedding_version
        )];
        for (text, vector) in self.texts.iter().zip(&self.response.vectors) {
            lines.push(format!("  {:<32} {}", truncate(text, 32), preview_vector(vector, 4)));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Embed the texts through a short-lived pipeline and print the result.
pub async fn execute(args: EmbedArgs, config: &Config, json_mode: bool) -> Result<()> {
    let service = build_service(config)?;
    let tenant = args.tenant.as_deref();

    let response = if args.pipeline {
        let pipeline = BatchPipeline::from_service(service)
            .context("Failed to start embedding pipeline")?;
        let result = embed_pipelined(&pipeline, &args).await;
        pipeline.close().await;
        result?
    } else {
        let request = args.request_for(args.texts.iter().cloned())?;
        service
            .embed_for_tenant(tenant, &request)
            .await
            .context("Embedding failed")?
    };

    output(
        &EmbedOutput {
            texts: args.texts,
            response,
        },
        json_mode,
    );
    Ok(())
}

/// Submit every text as its own job and stitch the results back in order.
async fn embed_pipelined(pipeline: &BatchPipeline, args: &EmbedArgs) -> Result<EmbeddingResponse> {
    let timeout = Duration::from_secs(args.timeout_secs);
    let jobs = args
        .texts
        .iter()
        .map(|text| {
            let request = args.request_for([text.as_str()])?;
            Ok(pipeline.submit_and_wait(args.tenant.as_deref(), request, timeout))
        })
        .collect::<Result<Vec<_>>>()?;

    let responses = futures::future::try_join_all(jobs)
        .await
        .context("Pipelined embedding failed")?;

    let mut responses = responses.into_iter();
    let mut combined = responses
        .next()
        .context("Pipeline returned no responses")?;
    for response in responses {
        combined.vectors.extend(response.vectors);
    }
    Ok(combined)
}
