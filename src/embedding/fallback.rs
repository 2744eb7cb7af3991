//! Fallback embedder (lexical-only mode).

use super::Embedder;
use crate::{Error, Result};

/// Embedder used when no embedding model is configured.
///
/// Every call reports the embedding as unavailable, so searches degrade to
/// `vector_similarity = 0` and rank on the remaining signals.
pub struct FallbackEmbedder;

impl FallbackEmbedder {
    /// Creates a new fallback embedder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for FallbackEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for FallbackEmbedder {
    fn dimensions(&self) -> usize {
        0
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::EmbeddingUnavailable(
            "no embedding provider configured".to_string(),
        ))
    }
}
