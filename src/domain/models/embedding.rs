//! Embedding request/response models.
//!
//! Requests are validated on construction and immutable afterwards; the
//! response carries the provider and model that were actually resolved.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{EmbeddingError, EmbeddingResult};

/// An ordered, non-empty batch of texts to embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEmbeddingRequest")]
pub struct EmbeddingRequest {
    inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normalize: Option<bool>,
}

#[derive(Deserialize)]
struct RawEmbeddingRequest {
    inputs: Vec<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    normalize: Option<bool>,
}

impl TryFrom<RawEmbeddingRequest> for EmbeddingRequest {
    type Error = EmbeddingError;

    fn try_from(raw: RawEmbeddingRequest) -> Result<Self, Self::Error> {
        let mut request = Self::new(raw.inputs)?;
        request.model = non_blank(raw.model);
        request.provider = non_blank(raw.provider);
        request.normalize = raw.normalize;
        Ok(request)
    }
}

impl EmbeddingRequest {
    /// Build a request, rejecting an empty list or any empty entry.
    pub fn new<I, S>(inputs: I) -> EmbeddingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        if inputs.is_empty() {
            return Err(EmbeddingError::Validation(
                "embedding request must contain at least one input".to_string(),
            ));
        }
        if let Some(index) = inputs.iter().position(String::is_empty) {
            return Err(EmbeddingError::Validation(format!(
                "embedding input at position {index} is empty"
            )));
        }

        Ok(Self {
            inputs,
            model: None,
            provider: None,
            normalize: None,
        })
    }

    /// Single-input request.
    pub fn single(text: impl Into<String>) -> EmbeddingResult<Self> {
        Self::new([text.into()])
    }

    /// Pin the model instead of resolving it from tenant or defaults.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = non_blank(Some(model.into()));
        self
    }

    /// Pin the provider instead of resolving it from tenant or defaults.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = non_blank(Some(provider.into()));
        self
    }

    /// Override the configured normalization flag.
    #[must_use]
    pub const fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = Some(normalize);
        self
    }

    /// Texts in request order.
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Model override.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Provider override.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Normalization override.
    pub const fn normalize(&self) -> Option<bool> {
        self.normalize
    }

    /// Number of texts.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Always false for a validated request.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Copy of this request restricted to `inputs`, keeping every override.
    ///
    /// Used to carve sub-batches; `inputs` must be a non-empty slice of this
    /// request's inputs.
    pub(crate) fn with_inputs(&self, inputs: &[String]) -> Self {
        Self {
            inputs: inputs.to_vec(),
            model: self.model.clone(),
            provider: self.provider.clone(),
            normalize: self.normalize,
        }
    }
}

/// Vectors for one request, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// One vector per input.
    pub vectors: Vec<Vec<f32>>,
    /// Length of every vector.
    pub dimension: usize,
    /// Provider that served the request.
    pub provider: String,
    pub model: String,
    /// Configured embedding version.
    pub embedding_version: String,
}

impl EmbeddingResponse {
    /// Build a response; the dimension is taken from the first vector.
    pub fn new(
        vectors: Vec<Vec<f32>>,
        provider: impl Into<String>,
        model: impl Into<String>,
        embedding_version: impl Into<String>,
    ) -> Self {
        let dimension = vectors.first().map_or(0, Vec::len);
        Self {
            vectors,
            dimension,
            provider: provider.into(),
            model: model.into(),
            embedding_version: embedding_version.into(),
        }
    }

    /// Number of vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether there are no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Dimension encoded in a model name's trailing `-<number>` token.
///
/// `hash-384` yields 384; `text-embedding-3-small` and `hash-0` yield nothing.
/// A zero-padded token such as the `002` of `text-embedding-ada-002` is a
/// version tag, not a dimension.
pub fn model_dimension(model: &str) -> Option<usize> {
    let (_, suffix) = model.trim().rsplit_once('-')?;
    if suffix.is_empty() || suffix.starts_with('0') || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<usize>().ok().filter(|dim| *dim > 0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
