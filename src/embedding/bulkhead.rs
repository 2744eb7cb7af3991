//! Concurrency limiting for shared embedding providers.
//!
//! Lazy embedding of a candidate pool fans out one call per record lacking an
//! embedding. When several searches share one provider, a bulkhead keeps the
//! total number of in-flight calls bounded.
//!
//! ```rust
//! use memweave::embedding::{BulkheadEmbedder, EmbeddingBulkheadConfig, HashEmbedder};
//! use memweave::Embedder;
//!
//! let bulkhead = BulkheadEmbedder::new(
//!     HashEmbedder::new(),
//!     EmbeddingBulkheadConfig::default().with_max_concurrent(2),
//! );
//! assert_eq!(bulkhead.embed("hello").map(|v| v.len()).ok(), Some(384));
//! ```

use super::Embedder;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Upper bound on waiting for a permit when no timeout is configured.
const MAX_WAIT_MS: u64 = 120_000;

/// Configuration for the embedding bulkhead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingBulkheadConfig {
    /// Maximum concurrent embedding calls.
    pub max_concurrent: usize,
    /// Timeout for acquiring a permit in milliseconds (0 = capped wait).
    pub acquire_timeout_ms: u64,
    /// Reject immediately when the bulkhead is full instead of waiting.
    pub fail_fast: bool,
}

impl Default for EmbeddingBulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            acquire_timeout_ms: 10_000,
            fail_fast: false,
        }
    }
}

impl EmbeddingBulkheadConfig {
    /// Loads configuration from the defaults plus environment overrides.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `MEMWEAVE_EMBEDDING_BULKHEAD_MAX_CONCURRENT` | Max concurrent calls | 4 |
    /// | `MEMWEAVE_EMBEDDING_BULKHEAD_ACQUIRE_TIMEOUT_MS` | Permit timeout | 10000 |
    /// | `MEMWEAVE_EMBEDDING_BULKHEAD_FAIL_FAST` | Fail when full | false |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("MEMWEAVE_EMBEDDING_BULKHEAD_MAX_CONCURRENT")
            && let Ok(parsed) = v.parse::<usize>()
        {
            config.max_concurrent = parsed.max(1);
        }
        if let Ok(v) = std::env::var("MEMWEAVE_EMBEDDING_BULKHEAD_ACQUIRE_TIMEOUT_MS")
            && let Ok(parsed) = v.parse::<u64>()
        {
            config.acquire_timeout_ms = parsed;
        }
        if let Ok(v) = std::env::var("MEMWEAVE_EMBEDDING_BULKHEAD_FAIL_FAST") {
            config.fail_fast = v.eq_ignore_ascii_case("true") || v == "1";
        }
        config
    }

    /// Sets the maximum concurrent calls.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Sets the acquire timeout in milliseconds.
    #[must_use]
    pub const fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Sets whether to fail fast when full.
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Embedder wrapper that bounds concurrent calls into the inner provider.
///
/// A rejected or timed-out acquisition surfaces as
/// [`Error::EmbeddingUnavailable`], which search treats like any other
/// provider failure.
pub struct BulkheadEmbedder<E: Embedder> {
    inner: E,
    config: EmbeddingBulkheadConfig,
    semaphore: Arc<Semaphore>,
}

impl<E: Embedder> BulkheadEmbedder<E> {
    /// Wraps an embedder.
    #[must_use]
    pub fn new(inner: E, config: EmbeddingBulkheadConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            inner,
            config,
            semaphore,
        }
    }

    /// Returns the number of free permits.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        if self.config.fail_fast {
            return Arc::clone(&self.semaphore)
                .try_acquire_owned()
                .map_err(|_| {
                    metrics::counter!("memweave_embedding_bulkhead_rejections_total", "reason" => "full")
                        .increment(1);
                    Error::EmbeddingUnavailable(format!(
                        "embedding bulkhead full (max: {})",
                        self.config.max_concurrent
                    ))
                });
        }

        let timeout_ms = if self.config.acquire_timeout_ms == 0 {
            MAX_WAIT_MS
        } else {
            self.config.acquire_timeout_ms
        };
        let timeout = Duration::from_millis(timeout_ms);
        let start = Instant::now();

        loop {
            if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
                return Ok(permit);
            }
            if start.elapsed() >= timeout {
                metrics::counter!("memweave_embedding_bulkhead_rejections_total", "reason" => "timeout")
                    .increment(1);
                return Err(Error::EmbeddingUnavailable(format!(
                    "embedding bulkhead acquire timed out after {timeout_ms}ms"
                )));
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl<E: Embedder> Embedder for BulkheadEmbedder<E> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _permit = self.acquire()?;
        tracing::trace!("acquired embedding bulkhead permit");
        self.inner.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let _permit = self.acquire()?;
        self.inner.embed_batch(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowEmbedder {
        delay_ms: u64,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowEmbedder {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay_ms,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for SlowEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(self.delay_ms));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![1.0; 8])
        }
    }

    #[test]
    fn test_config_builder() {
        let config = EmbeddingBulkheadConfig::default()
            .with_max_concurrent(3)
            .with_acquire_timeout_ms(50)
            .with_fail_fast(true);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.acquire_timeout_ms, 50);
        assert!(config.fail_fast);
    }

    #[test]
    fn test_passthrough() {
        let bulkhead = BulkheadEmbedder::new(SlowEmbedder::new(0), EmbeddingBulkheadConfig::default());
        assert_eq!(bulkhead.dimensions(), 8);
        assert_eq!(bulkhead.embed("x").unwrap().len(), 8);
        assert_eq!(bulkhead.available_permits(), 4);
    }

    #[test]
    fn test_limits_concurrency() {
        let bulkhead = BulkheadEmbedder::new(
            SlowEmbedder::new(20),
            EmbeddingBulkheadConfig::default().with_max_concurrent(2),
        );
        std::thread::scope(|s| {
            for _ in 0..6 {
                s.spawn(|| bulkhead.embed("x"));
            }
        });
        assert!(bulkhead.inner.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_fail_fast_when_full() {
        let bulkhead = BulkheadEmbedder::new(
            SlowEmbedder::new(100),
            EmbeddingBulkheadConfig::default()
                .with_max_concurrent(1)
                .with_fail_fast(true),
        );
        let _held = Arc::clone(&bulkhead.semaphore).try_acquire_owned().unwrap();
        assert!(matches!(
            bulkhead.embed("x"),
            Err(Error::EmbeddingUnavailable(_))
        ));
    }
}
