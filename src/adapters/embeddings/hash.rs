//! Deterministic local embedding provider.
//!
//! Derives vectors from SHA-256 of the input text, so identical text always
//! maps to the identical vector with no model assets. Useful as the default
//! provider and in tests; the vectors carry no semantic meaning.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::domain::errors::{EmbeddingError, EmbeddingResult};
use crate::domain::models::model_dimension;
use crate::domain::ports::EmbeddingProvider;

/// Dimension of the bare `hash` model.
pub const HASH_DEFAULT_DIMENSION: usize = 384;

/// Largest dimension a `hash-<dim>` model may request.
pub const HASH_MAX_DIMENSION: usize = 8192;

/// Provider serving `hash` and `hash-<dim>` models.
#[derive(Debug, Clone, Default)]
pub struct HashEmbeddingProvider;

impl HashEmbeddingProvider {
    /// Registry name of this provider.
    pub const NAME: &'static str = "hash";

    /// Stateless provider.
    pub fn new() -> Self {
        Self
    }

    fn dimension_for(model: &str) -> Option<usize> {
        if model == Self::NAME {
            return Some(HASH_DEFAULT_DIMENSION);
        }
        let suffix = model.strip_prefix("hash-")?;
        if suffix.contains('-') {
            return None;
        }
        model_dimension(model).filter(|dim| *dim <= HASH_MAX_DIMENSION)
    }
}

/// Expand SHA-256 blocks of `text` into `dimension` values in `[-1, 1]`.
fn hash_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = Vec::with_capacity(dimension);
    let mut block: u32 = 0;
    while vector.len() < dimension {
        let digest = Sha256::new()
            .chain_update(block.to_le_bytes())
            .chain_update(text.as_bytes())
            .finalize();
        for chunk in digest.chunks_exact(4) {
            if vector.len() == dimension {
                break;
            }
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let value = (f64::from(raw) / f64::from(u32::MAX)).mul_add(2.0, -1.0) as f32;
            vector.push(value);
        }
        block = block.wrapping_add(1);
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports(&self, model: &str) -> bool {
        Self::dimension_for(model).is_some()
    }

    async fn embed_all(&self, inputs: &[String], model: &str) -> EmbeddingResult<Vec<Vec<f32>>> {
        let dimension = Self::dimension_for(model).ok_or_else(|| EmbeddingError::UnsupportedModel {
            provider: Self::NAME.to_string(),
            model: model.to_string(),
        })?;

        Ok(inputs.iter().map(|text| hash_vector(text, dimension)).collect())
    }
}
