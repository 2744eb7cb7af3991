//! Search types, options, and filters.

use super::{MemoryRecord, Scope};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Weights for blending vector and keyword signals in hybrid mode.
///
/// The weights need not sum to 1, but scores only stay in `[0, 1]` when they
/// approximately do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchWeights {
    /// Weight of the vector similarity.
    pub vector: f32,
    /// Weight of the lexical score.
    pub keyword: f32,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            vector: 0.7,
            keyword: 0.3,
        }
    }
}

impl SearchWeights {
    /// Creates a weight pair.
    #[must_use]
    pub const fn new(vector: f32, keyword: f32) -> Self {
        Self { vector, keyword }
    }
}

/// Ranking options for a search call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum number of results (at least 1).
    pub limit: usize,
    /// Inclusive cutoff on the final score.
    pub threshold: f32,
    /// Whether to blend lexical scores into the ranking.
    pub hybrid: bool,
    /// Signal weights used in hybrid mode.
    pub weights: SearchWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            threshold: 0.0,
            hybrid: true,
            weights: SearchWeights::default(),
        }
    }
}

impl SearchOptions {
    /// Sets the result limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the final-score threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enables or disables hybrid ranking.
    #[must_use]
    pub const fn with_hybrid(mut self, hybrid: bool) -> Self {
        self.hybrid = hybrid;
        self
    }

    /// Sets the signal weights.
    #[must_use]
    pub const fn with_weights(mut self, weights: SearchWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Checks that weights and threshold lie in `[0, 1]` and the limit is positive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::InvalidInput("limit must be at least 1".to_string()));
        }
        check_unit("threshold", self.threshold)?;
        check_unit("vector weight", self.weights.vector)?;
        check_unit("keyword weight", self.weights.keyword)
    }
}

pub(crate) fn check_unit(name: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// Scope filter applied to a candidate pool before ranking.
///
/// Every populated field must match; tags use AND logic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Required tenant.
    pub tenant_id: Option<String>,
    /// Required brand.
    pub brand_id: Option<String>,
    /// Required customer.
    pub customer_id: Option<String>,
    /// Required tags.
    pub tags: Vec<String>,
}

impl SearchFilter {
    /// Creates an empty filter (matches all).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tenant_id: None,
            brand_id: None,
            customer_id: None,
            tags: Vec::new(),
        }
    }

    /// Creates a filter matching a scope exactly as far as it is specified.
    #[must_use]
    pub fn for_scope(scope: &Scope) -> Self {
        Self {
            tenant_id: Some(scope.tenant_id.clone()),
            brand_id: scope.brand_id.clone(),
            customer_id: scope.customer_id.clone(),
            tags: Vec::new(),
        }
    }

    /// Adds a required tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Returns true if the filter is empty (matches all).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tenant_id.is_none()
            && self.brand_id.is_none()
            && self.customer_id.is_none()
            && self.tags.is_empty()
    }

    /// Returns true if the record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        let scope = &record.scope;
        self.tenant_id
            .as_ref()
            .is_none_or(|t| *t == scope.tenant_id)
            && self
                .brand_id
                .as_ref()
                .is_none_or(|b| scope.brand_id.as_ref() == Some(b))
            && self
                .customer_id
                .as_ref()
                .is_none_or(|c| scope.customer_id.as_ref() == Some(c))
            && self.tags.iter().all(|tag| {
                record
                    .tags
                    .iter()
                    .any(|have| have.eq_ignore_ascii_case(tag))
            })
    }
}

/// A search call against a candidate pool.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Free-text query.
    pub query: String,
    /// Query embedding computed by the caller; embedded on demand when absent.
    pub query_embedding: Option<Vec<f32>>,
    /// Scope filter; `None` when the pool is already scope-filtered.
    pub filter: Option<SearchFilter>,
    /// Ranking options.
    pub options: SearchOptions,
}

impl SearchRequest {
    /// Creates a request with default options over an already-filtered pool.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Supplies a precomputed query embedding.
    #[must_use]
    pub fn with_query_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.query_embedding = Some(embedding);
        self
    }

    /// Applies a scope filter before ranking.
    #[must_use]
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the ranking options.
    #[must_use]
    pub const fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }
}

/// Whether a candidate's vector similarity was actually computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorStatus {
    /// Similarity computed from the query and record embeddings.
    Scored,
    /// No usable embedding on one side; similarity forced to `0.0`.
    Unavailable,
}

/// A candidate with its full relevance breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// The scored record.
    pub record: MemoryRecord,
    /// Cosine similarity between query and record embeddings.
    pub vector_similarity: f32,
    /// Lexical overlap score (`0.0` outside hybrid mode).
    pub keyword_score: f32,
    /// Weighted blend of the two signals.
    pub combined_score: f32,
    /// Edit-gap recency multiplier in `[0.9, 1.0]`.
    pub recency_factor: f32,
    /// Importance multiplier in `[0.8, 1.0]`.
    pub importance_factor: f32,
    /// `combined_score * recency_factor * importance_factor`.
    pub final_score: f32,
    /// Whether the vector signal was available.
    pub vector_status: VectorStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(tenant: &str, brand: Option<&str>, tags: &[&str]) -> MemoryRecord {
        let mut scope = Scope::tenant(tenant);
        if let Some(b) = brand {
            scope = scope.with_brand(b);
        }
        MemoryRecord::new("m", "c", scope, Utc::now()).with_tags(tags.iter().copied())
    }

    #[test]
    fn test_default_options_are_valid() {
        assert!(SearchOptions::default().validate().is_ok());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = SearchOptions::default().with_limit(0).validate();
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_out_of_range_weight_rejected() {
        let options = SearchOptions::default().with_weights(SearchWeights::new(1.5, 0.0));
        assert!(options.validate().is_err());
        let options = SearchOptions::default().with_threshold(-0.1);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = SearchFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&record("a", None, &[])));
    }

    #[test]
    fn test_scope_filter() {
        let filter = SearchFilter::for_scope(&Scope::tenant("a").with_brand("b1"));
        assert!(filter.matches(&record("a", Some("b1"), &[])));
        assert!(!filter.matches(&record("a", Some("b2"), &[])));
        assert!(!filter.matches(&record("a", None, &[])));
        assert!(!filter.matches(&record("z", Some("b1"), &[])));
    }

    #[test]
    fn test_tag_filter_is_conjunctive() {
        let filter = SearchFilter::new().with_tag("launch").with_tag("Summer");
        assert!(filter.matches(&record("a", None, &["summer", "launch", "x"])));
        assert!(!filter.matches(&record("a", None, &["launch"])));
    }
}
