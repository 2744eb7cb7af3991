//! # Memweave
//!
//! Relevance ranking and connection inference for multi-tenant memory stores.
//!
//! Given a free-text query and a scoped pool of memory records, memweave ranks
//! the pool by a reproducible blend of vector similarity, keyword overlap,
//! edit recency, and importance. For a source record it infers typed, weighted
//! connections to other records, which can be assembled into a knowledge graph.
//!
//! Persistence, authorization, and the embedding/LLM models themselves stay
//! with the caller: records arrive as in-memory slices, and models are reached
//! through the [`Embedder`] and [`TopicImportanceProvider`] traits.
//!
//! ## Example
//!
//! ```rust
//! use memweave::embedding::HashEmbedder;
//! use memweave::models::{MemoryRecord, Scope, SearchRequest};
//! use memweave::services::RecallService;
//! use std::sync::Arc;
//!
//! let service = RecallService::new(Arc::new(HashEmbedder::new()));
//! let now = chrono::Utc::now();
//! let pool = vec![
//!     MemoryRecord::new("m1", "summer marketing strategy", Scope::tenant("acme"), now),
//!     MemoryRecord::new("m2", "quarterly tax filing", Scope::tenant("acme"), now),
//! ];
//! let results = service.search(&SearchRequest::new("marketing strategy"), &pool)?;
//! assert_eq!(results[0].id.as_str(), "m1");
//! # Ok::<(), memweave::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod analysis;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;

pub use analysis::{ContentAnalysis, HeuristicAnalyzer, ResilientAnalyzer, TopicImportanceProvider};
pub use config::EngineConfig;
pub use embedding::{Embedder, cosine_similarity};
pub use llm::LlmProvider;
pub use models::{
    ConnectionSuggestion, ConnectionType, MemoryId, MemoryRecord, ScoredCandidate, SearchOptions,
    SearchRequest, SearchWeights,
};
pub use services::{ConnectionService, KnowledgeGraphBuilder, RecallService, lexical_score};

/// Error type for memweave operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `DimensionMismatch` | Two embeddings of different lengths are compared |
/// | `EmbeddingUnavailable` | An embedding provider fails or returns nothing |
/// | `InvalidInput` | Options out of range, malformed provider output |
/// | `OperationFailed` | Config I/O or parsing fails, logging init fails |
///
/// Scoring never lets a single candidate's error escape: the search and
/// connection services log and skip, so callers mostly see `InvalidInput`.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Embeddings of different dimensionality were compared.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality of the reference vector.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },

    /// The embedding provider could not produce a vector.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A weight or threshold lies outside `[0, 1]`
    /// - A limit of zero is requested
    /// - Text handed to an embedder is empty
    /// - A model response cannot be parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for memweave operations.
pub type Result<T> = std::result::Result<T, Error>;
