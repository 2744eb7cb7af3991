//! Benchmarks for ranking and connection inference.
//!
//! Pools of 100 and 1,000 records, with embeddings precomputed and computed
//! on demand, plus connection suggestion over the same pools.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use memweave::embedding::{Embedder, FallbackEmbedder, HashEmbedder};
use memweave::models::{MemoryRecord, Scope, SearchOptions, SearchRequest};
use memweave::services::{ConnectionService, RecallService};
use std::hint::black_box;
use std::sync::Arc;

const TOPICS: [&str; 8] = [
    "marketing", "pricing", "launch", "budget", "roadmap", "hiring", "support", "security",
];

// ============================================================================
// Helper Functions
// ============================================================================

fn make_pool(size: usize, embedded: bool) -> Vec<MemoryRecord> {
    let embedder = HashEmbedder::new();
    let now = Utc::now();
    (0..size)
        .map(|i| {
            let content = format!(
                "Note {i} on {} and {} for the {} team",
                TOPICS[i % TOPICS.len()],
                TOPICS[(i * 3) % TOPICS.len()],
                TOPICS[(i * 5) % TOPICS.len()],
            );
            let record = MemoryRecord::new(format!("m{i}"), content.clone(), Scope::tenant("acme"), now);
            if embedded {
                record.with_embedding(embedder.embed(&content).unwrap())
            } else {
                record
            }
        })
        .collect()
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let request = SearchRequest::new("marketing budget")
        .with_options(SearchOptions::default().with_limit(10));

    for size in [100, 1_000] {
        let embedded = make_pool(size, true);
        let hash = RecallService::new(Arc::new(HashEmbedder::new()));
        group.bench_with_input(BenchmarkId::new("precomputed", size), &embedded, |b, pool| {
            b.iter(|| hash.search(black_box(&request), black_box(pool)).unwrap());
        });

        let lazy = make_pool(size, false);
        group.bench_with_input(BenchmarkId::new("lazy_embedding", size), &lazy, |b, pool| {
            b.iter(|| hash.search(black_box(&request), black_box(pool)).unwrap());
        });

        let lexical = RecallService::new(Arc::new(FallbackEmbedder::new()));
        group.bench_with_input(BenchmarkId::new("lexical_only", size), &lazy, |b, pool| {
            b.iter(|| lexical.search(black_box(&request), black_box(pool)).unwrap());
        });
    }

    group.finish();
}

fn bench_connections(c: &mut Criterion) {
    let mut group = c.benchmark_group("connections");
    let service = ConnectionService::default();

    for size in [100, 1_000] {
        let pool = make_pool(size, false);
        let source = pool[0].clone();
        group.bench_with_input(BenchmarkId::new("suggest", size), &pool, |b, pool| {
            b.iter(|| service.suggest(black_box(&source), black_box(pool), Some(10)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_search, bench_connections);
criterion_main!(benches);
