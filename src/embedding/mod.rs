//! Embedding providers and vector math.
//!
//! The engine never generates embeddings itself in production; it calls an
//! [`Embedder`] supplied by the host. [`HashEmbedder`] exists for development
//! and tests, and [`FallbackEmbedder`] disables the vector signal entirely.

// Allow cast precision loss for hash-based embedding calculations.
#![allow(clippy::cast_precision_loss)]
// Allow cast possible truncation for hash index calculations on 32-bit platforms.
#![allow(clippy::cast_possible_truncation)]

mod bulkhead;
mod fallback;
mod hash;
mod similarity;

pub use bulkhead::{BulkheadEmbedder, EmbeddingBulkheadConfig};
pub use fallback::FallbackEmbedder;
pub use hash::HashEmbedder;
pub use similarity::{cosine_similarity, validate_embedding};

use crate::Result;

/// Trait for embedding providers.
///
/// Implementations may fail; callers in this crate degrade the vector signal
/// to zero instead of propagating the failure.
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimensions (`0` if unknown or disabled).
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}
