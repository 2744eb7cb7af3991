//! Relevance scoring of a single query/record pair.
//!
//! ```text
//! combined  = hybrid ? vector * w_vector + keyword * w_keyword : vector
//! recency   = 1.0 - min(edit_gap_days, 365) / 365 * 0.1
//! importance= 0.8 + importance * 0.2
//! final     = combined * recency * importance
//! ```
//!
//! Recency measures the gap between creation and last update, not age
//! relative to now: a record edited a year after it was written keeps `0.9`,
//! and an old record that was never edited keeps `1.0`.

use super::lexical::lexical_score;
use crate::embedding::cosine_similarity;
use crate::models::{MemoryRecord, ScoredCandidate, SearchOptions, SearchWeights, VectorStatus};
use crate::Result;
use chrono::{DateTime, Utc};

/// Edit gap (in days) at which the recency penalty saturates.
pub const RECENCY_HORIZON_DAYS: i64 = 365;

/// Largest recency penalty.
pub const MAX_RECENCY_PENALTY: f32 = 0.1;

/// Floor of the importance factor.
pub const IMPORTANCE_FACTOR_BASE: f32 = 0.8;

/// Computes the recency factor from the creation-to-update gap.
///
/// Gaps are counted in whole days; negative gaps count as zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recency_factor(created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> f32 {
    let days = (updated_at - created_at)
        .num_days()
        .clamp(0, RECENCY_HORIZON_DAYS);
    1.0 - days as f32 / RECENCY_HORIZON_DAYS as f32 * MAX_RECENCY_PENALTY
}

/// Computes the importance factor in `[0.8, 1.0]`.
#[must_use]
pub fn importance_factor(importance: f32) -> f32 {
    let importance = if importance.is_finite() {
        importance.clamp(0.0, 1.0)
    } else {
        crate::models::DEFAULT_IMPORTANCE
    };
    importance.mul_add(1.0 - IMPORTANCE_FACTOR_BASE, IMPORTANCE_FACTOR_BASE)
}

/// Scores records against a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceScorer {
    weights: SearchWeights,
    hybrid: bool,
}

impl RelevanceScorer {
    /// Creates a scorer.
    #[must_use]
    pub const fn new(weights: SearchWeights, hybrid: bool) -> Self {
        Self { weights, hybrid }
    }

    /// Creates a scorer from search options.
    #[must_use]
    pub const fn from_options(options: &SearchOptions) -> Self {
        Self::new(options.weights, options.hybrid)
    }

    /// Scores a record using its own embedding.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] if the embeddings differ in length.
    pub fn score_record(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        record: &MemoryRecord,
    ) -> Result<ScoredCandidate> {
        self.score(query, query_embedding, record, record.usable_embedding())
    }

    /// Scores a record with an explicitly supplied record embedding.
    ///
    /// A missing embedding on either side yields `vector_similarity = 0.0`
    /// and [`VectorStatus::Unavailable`] rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DimensionMismatch`] if the embeddings differ in length.
    pub fn score(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        record: &MemoryRecord,
        record_embedding: Option<&[f32]>,
    ) -> Result<ScoredCandidate> {
        let (vector_similarity, vector_status) = match (query_embedding, record_embedding) {
            (Some(q), Some(r)) if !q.is_empty() && !r.is_empty() => {
                (cosine_similarity(q, r)?, VectorStatus::Scored)
            },
            _ => (0.0, VectorStatus::Unavailable),
        };

        let (keyword_score, combined_score) = if self.hybrid {
            let keyword = lexical_score(query, &record.content);
            let combined = vector_similarity
                .mul_add(self.weights.vector, keyword * self.weights.keyword);
            (keyword, combined)
        } else {
            (0.0, vector_similarity)
        };

        let recency = recency_factor(record.created_at, record.updated_at);
        let importance = importance_factor(record.importance);
        let final_score = combined_score * recency * importance;

        tracing::trace!(
            id = %record.id,
            vector_similarity,
            keyword_score,
            recency,
            importance,
            final_score,
            "Scored candidate"
        );

        Ok(ScoredCandidate {
            record: record.clone(),
            vector_similarity,
            keyword_score,
            combined_score,
            recency_factor: recency,
            importance_factor: importance,
            final_score,
            vector_status,
        })
    }
}
