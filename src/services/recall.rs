//! Memory recall (search) service.
//!
//! Ranks a caller-supplied candidate pool against a free-text query. The pool
//! is scope-filtered, every candidate is scored independently by
//! [`RelevanceScorer`], and results are thresholded, sorted, and truncated.
//!
//! Candidates without an embedding are embedded on demand, a bounded number
//! at a time. A candidate that fails to embed is still ranked on its lexical
//! score; a candidate whose embedding has the wrong dimensionality is logged
//! and skipped. Neither aborts the search.

use super::scoring::RelevanceScorer;
use crate::embedding::{Embedder, validate_embedding};
use crate::models::{MemoryRecord, ScoredCandidate, SearchRequest};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Default number of candidate embeddings computed concurrently.
pub const DEFAULT_MAX_CONCURRENT_EMBEDDINGS: usize = 4;

/// Service for searching and ranking memories.
#[derive(Clone)]
pub struct RecallService {
    embedder: Arc<dyn Embedder>,
    dimensions: Option<usize>,
    max_concurrent: usize,
}

impl RecallService {
    /// Creates a recall service over an embedding provider.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            dimensions: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT_EMBEDDINGS,
        }
    }

    /// Requires every embedding to have exactly `dimensions` components.
    ///
    /// Without this, the query embedding's length is the reference.
    #[must_use]
    pub const fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Sets how many candidate embeddings are computed at once.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = if max_concurrent == 0 { 1 } else { max_concurrent };
        self
    }

    /// Returns the configured dimensionality, if any.
    #[must_use]
    pub const fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    /// Returns a copy of the pool with missing embeddings filled in.
    ///
    /// Each record lacking an embedding is embedded exactly once. Records
    /// that fail to embed are copied unchanged and rank lexically later.
    #[must_use]
    #[instrument(skip_all, fields(operation = "recall.embed_pool", records = pool.len()))]
    pub fn embed_pool(&self, pool: &[MemoryRecord]) -> Vec<MemoryRecord> {
        let refs: Vec<&MemoryRecord> = pool.iter().collect();
        let fetched = self.embed_missing(&refs);
        pool.iter()
            .zip(fetched)
            .map(|(record, embedding)| match embedding {
                Some(embedding) => record.clone().with_embedding(embedding),
                None => record.clone(),
            })
            .collect()
    }

    /// Searches the pool and returns the ranked records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the search options are invalid.
    pub fn search(
        &self,
        request: &SearchRequest,
        candidates: &[MemoryRecord],
    ) -> Result<Vec<MemoryRecord>> {
        Ok(self
            .search_detailed(request, candidates)?
            .into_iter()
            .map(|scored| scored.record)
            .collect())
    }

    /// Searches the pool and returns every result with its score breakdown.
    ///
    /// Results are ordered by `final_score` descending; equal scores keep
    /// pool order. An empty query or an empty pool yields no results.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the search options are invalid.
    #[instrument(
        skip_all,
        fields(
            operation = "recall.search",
            candidates = candidates.len(),
            limit = request.options.limit,
            hybrid = request.options.hybrid
        )
    )]
    pub fn search_detailed(
        &self,
        request: &SearchRequest,
        candidates: &[MemoryRecord],
    ) -> Result<Vec<ScoredCandidate>> {
        request.options.validate()?;
        let start = Instant::now();

        if request.query.trim().is_empty() {
            tracing::debug!("Empty query, returning no results");
            return Ok(Vec::new());
        }

        let pool: Vec<&MemoryRecord> = match &request.filter {
            Some(filter) if !filter.is_empty() => {
                candidates.iter().filter(|r| filter.matches(r)).collect()
            },
            _ => candidates.iter().collect(),
        };
        if pool.is_empty() {
            tracing::debug!("No candidates in scope");
            return Ok(Vec::new());
        }

        let query_embedding = self.resolve_query_embedding(request);
        let fetched = if query_embedding.is_some() {
            self.embed_missing(&pool)
        } else {
            vec![None; pool.len()]
        };

        let scorer = RelevanceScorer::from_options(&request.options);
        let mut results: Vec<ScoredCandidate> = Vec::with_capacity(pool.len());
        for (record, fetched_embedding) in pool.iter().zip(&fetched) {
            let record_embedding = precomputed_embedding(record).or(fetched_embedding.as_deref());
            match scorer.score(
                &request.query,
                query_embedding.as_deref(),
                record,
                record_embedding,
            ) {
                Ok(scored) => results.push(scored),
                Err(Error::DimensionMismatch { expected, actual }) => {
                    metrics::counter!("memweave_dimension_mismatch_total").increment(1);
                    tracing::warn!(
                        id = %record.id,
                        expected,
                        actual,
                        "Skipping candidate with mismatched embedding"
                    );
                },
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "Skipping unscorable candidate");
                },
            }
        }

        let threshold = request.options.threshold;
        results.retain(|c| c.final_score >= threshold);
        results.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        results.truncate(request.options.limit);

        metrics::counter!("memweave_search_requests_total").increment(1);
        metrics::counter!("memweave_search_candidates_total").increment(pool.len() as u64);
        metrics::histogram!("memweave_search_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            returned = results.len(),
            vector = query_embedding.is_some(),
            "Search complete"
        );

        Ok(results)
    }

    /// Uses the caller's query embedding or embeds the query text.
    ///
    /// Returns `None` when no valid query embedding can be obtained, which
    /// turns off the vector signal for the whole call.
    fn resolve_query_embedding(&self, request: &SearchRequest) -> Option<Vec<f32>> {
        let embedding = match &request.query_embedding {
            Some(embedding) => embedding.clone(),
            None => match self.embedder.embed(&request.query) {
                Ok(embedding) => embedding,
                Err(e) => {
                    metrics::counter!("memweave_embedding_failures_total", "target" => "query")
                        .increment(1);
                    tracing::warn!(error = %e, "Query embedding failed, ranking lexically");
                    return None;
                },
            },
        };

        match validate_embedding(&embedding, self.dimensions) {
            Ok(()) => Some(embedding),
            Err(e) => {
                if matches!(e, Error::DimensionMismatch { .. }) {
                    metrics::counter!("memweave_dimension_mismatch_total").increment(1);
                }
                tracing::warn!(error = %e, "Unusable query embedding, ranking lexically");
                None
            },
        }
    }

    /// Embeds every pooled record lacking an embedding.
    ///
    /// Returns one slot per pooled record; records that already carry an
    /// embedding or fail to embed get `None`.
    fn embed_missing(&self, pool: &[&MemoryRecord]) -> Vec<Option<Vec<f32>>> {
        let mut fetched: Vec<Option<Vec<f32>>> = vec![None; pool.len()];
        let missing: Vec<usize> = pool
            .iter()
            .enumerate()
            .filter(|(_, record)| record.usable_embedding().is_none())
            .map(|(index, _)| index)
            .collect();
        if missing.is_empty() {
            return fetched;
        }
        tracing::debug!(missing = missing.len(), "Embedding candidates on demand");

        for chunk in missing.chunks(self.max_concurrent) {
            let embedded: Vec<(usize, Option<Vec<f32>>)> = std::thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|&index| {
                        let record = pool[index];
                        (index, scope.spawn(move || self.embed_candidate(record)))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|(index, handle)| (index, handle.join().ok().flatten()))
                    .collect()
            });
            for (index, embedding) in embedded {
                fetched[index] = embedding;
            }
        }

        fetched
    }

    fn embed_candidate(&self, record: &MemoryRecord) -> Option<Vec<f32>> {
        let result = self
            .embedder
            .embed(&record.content)
            .and_then(|embedding| {
                validate_embedding(&embedding, self.dimensions).map(|()| embedding)
            });
        match result {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                metrics::counter!("memweave_embedding_failures_total", "target" => "candidate")
                    .increment(1);
                tracing::warn!(id = %record.id, error = %e, "Candidate embedding failed");
                None
            },
        }
    }
}

/// Returns the record's own embedding if every component is finite.
///
/// Dimensionality is left to the scorer so that mismatches are skipped, not
/// degraded.
fn precomputed_embedding(record: &MemoryRecord) -> Option<&[f32]> {
    let embedding = record.usable_embedding()?;
    match validate_embedding(embedding, None) {
        Ok(()) => Some(embedding),
        Err(e) => {
            metrics::counter!("memweave_embedding_failures_total", "target" => "candidate")
                .increment(1);
            tracing::warn!(id = %record.id, error = %e, "Ignoring unusable stored embedding");
            None
        },
    }
}

impl std::fmt::Debug for RecallService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecallService")
            .field("embedder_dimensions", &self.embedder.dimensions())
            .field("dimensions", &self.dimensions)
            .field("max_concurrent", &self.max_concurrent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{FallbackEmbedder, HashEmbedder};
    use crate::models::{Scope, SearchFilter, SearchOptions, VectorStatus};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn record(id: &str, content: &str) -> MemoryRecord {
        MemoryRecord::new(id, content, Scope::tenant("acme"), at())
    }

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("broken") {
                return Err(Error::EmbeddingUnavailable("model offline".to_string()));
            }
            Ok(vec![1.0, 0.0])
        }
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let service = RecallService::new(Arc::new(HashEmbedder::new()));
        let pool = vec![record("m1", "marketing")];
        let results = service.search(&SearchRequest::new("   "), &pool).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_empty_pool_returns_nothing() {
        let service = RecallService::new(Arc::new(HashEmbedder::new()));
        let results = service.search(&SearchRequest::new("marketing"), &[]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let service = RecallService::new(Arc::new(HashEmbedder::new()));
        let request =
            SearchRequest::new("marketing").with_options(SearchOptions::default().with_limit(0));
        assert!(matches!(
            service.search(&request, &[record("m1", "marketing")]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_filter_applies_before_ranking() {
        let service = RecallService::new(Arc::new(HashEmbedder::new()));
        let other = MemoryRecord::new("m2", "marketing plan", Scope::tenant("globex"), at());
        let pool = vec![record("m1", "marketing plan"), other];
        let request = SearchRequest::new("marketing plan")
            .with_filter(SearchFilter::for_scope(&Scope::tenant("acme")));
        let results = service.search(&request, &pool).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_str(), "m1");
    }

    #[test]
    fn test_embedder_failure_degrades_to_lexical() {
        let service = RecallService::new(Arc::new(FallbackEmbedder::new()));
        let pool = vec![record("m1", "marketing plan"), record("m2", "tax filing")];
        let results = service
            .search_detailed(&SearchRequest::new("marketing"), &pool)
            .unwrap();
        assert_eq!(results[0].record.id.as_str(), "m1");
        assert!(
            results
                .iter()
                .all(|c| c.vector_status == VectorStatus::Unavailable)
        );
    }

    #[test]
    fn test_only_missing_embeddings_are_computed() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let service = RecallService::new(embedder.clone()).with_max_concurrent(2);
        let pool = vec![
            record("m1", "alpha").with_embedding(vec![1.0, 0.0]),
            record("m2", "bravo"),
            record("m3", "charlie"),
            record("m4", "delta"),
        ];
        let request = SearchRequest::new("query").with_query_embedding(vec![1.0, 0.0]);
        let results = service.search_detailed(&request, &pool).unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_failed_candidate_embedding_is_isolated() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let service = RecallService::new(embedder);
        let pool = vec![record("m1", "broken record"), record("m2", "fine record")];
        let request = SearchRequest::new("record")
            .with_query_embedding(vec![1.0, 0.0])
            .with_options(SearchOptions::default().with_limit(10));
        let results = service.search_detailed(&request, &pool).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id.as_str(), "m2");
        assert_eq!(results[1].vector_status, VectorStatus::Unavailable);
    }

    #[test]
    fn test_non_finite_precomputed_embedding_degrades() {
        let service = RecallService::new(Arc::new(FallbackEmbedder::new()));
        let pool = vec![
            record("nan", "marketing plan").with_embedding(vec![f32::NAN, 0.0]),
            record("ok", "marketing plan").with_embedding(vec![1.0, 0.0]),
        ];
        let request = SearchRequest::new("marketing plan").with_query_embedding(vec![1.0, 0.0]);
        let results = service.search_detailed(&request, &pool).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id.as_str(), "ok");
        assert_eq!(results[0].vector_status, VectorStatus::Scored);
        assert_eq!(results[1].record.id.as_str(), "nan");
        assert_eq!(results[1].vector_status, VectorStatus::Unavailable);
        assert!(results[1].vector_similarity.abs() < f32::EPSILON);
        assert!(results[1].final_score.is_finite() && results[1].final_score > 0.0);
    }

    #[test]
    fn test_embed_pool_fills_missing_once() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let service = RecallService::new(embedder.clone());
        let pool = vec![
            record("m1", "alpha").with_embedding(vec![0.0, 1.0]),
            record("m2", "bravo"),
            record("m3", "broken charlie"),
        ];
        let embedded = service.embed_pool(&pool);

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(embedded[0].embedding, Some(vec![0.0, 1.0]));
        assert_eq!(embedded[1].embedding, Some(vec![1.0, 0.0]));
        assert!(embedded[2].embedding.is_none());
        assert!(pool[1].embedding.is_none());
    }

    #[test]
    fn test_mismatched_candidate_is_skipped() {
        let service = RecallService::new(Arc::new(FallbackEmbedder::new()));
        let pool = vec![
            record("m1", "alpha").with_embedding(vec![1.0, 0.0, 0.0]),
            record("m2", "alpha").with_embedding(vec![1.0, 0.0]),
        ];
        let request = SearchRequest::new("alpha").with_query_embedding(vec![1.0, 0.0]);
        let results = service.search(&request, &pool).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_str(), "m2");
    }

    #[test]
    fn test_configured_dimensions_reject_query_embedding() {
        let service = RecallService::new(Arc::new(FallbackEmbedder::new())).with_dimensions(3);
        let pool = vec![record("m1", "alpha").with_embedding(vec![1.0, 0.0])];
        let request = SearchRequest::new("alpha").with_query_embedding(vec![1.0, 0.0]);
        let results = service.search_detailed(&request, &pool).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].vector_status, VectorStatus::Unavailable);
    }

    #[test]
    fn test_threshold_and_limit() {
        let service = RecallService::new(Arc::new(FallbackEmbedder::new()));
        let pool = vec![
            record("m1", "alpha bravo"),
            record("m2", "alpha"),
            record("m3", "zulu"),
        ];
        let request = SearchRequest::new("alpha bravo").with_options(
            SearchOptions::default()
                .with_threshold(0.01)
                .with_limit(1),
        );
        let results = service.search(&request, &pool).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_str(), "m1");
    }

    #[test]
    fn test_ties_keep_pool_order() {
        let service = RecallService::new(Arc::new(FallbackEmbedder::new()));
        let pool = vec![record("b", "same text"), record("a", "same text")];
        let results = service.search(&SearchRequest::new("same"), &pool).unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
