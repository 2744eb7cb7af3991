//! Vector math over embeddings.

use crate::{Error, Result};

/// Computes cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` when either vector has zero
/// magnitude so that scoring stays total.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the lengths differ and
/// [`Error::InvalidInput`] if the vectors are empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.is_empty() {
        return Err(Error::InvalidInput(
            "cannot compare empty embeddings".to_string(),
        ));
    }

    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (norm_a * norm_b))
}

/// Checks that an embedding is usable at the deployment dimensionality.
///
/// # Errors
///
/// Returns [`Error::EmbeddingUnavailable`] for an empty vector,
/// [`Error::InvalidInput`] for non-finite components, and
/// [`Error::DimensionMismatch`] when `expected` is set and differs.
pub fn validate_embedding(embedding: &[f32], expected: Option<usize>) -> Result<()> {
    if embedding.is_empty() {
        return Err(Error::EmbeddingUnavailable(
            "provider returned an empty vector".to_string(),
        ));
    }
    if let Some(expected) = expected
        && embedding.len() != expected
    {
        return Err(Error::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(
            "embedding contains non-finite values".to_string(),
        ));
    }
    Ok(())
}
