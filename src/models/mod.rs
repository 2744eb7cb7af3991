//! Data models for memweave.
//!
//! Records are inputs owned by the caller; everything else is created fresh per
//! call and handed back.

mod connection;
pub mod graph;
mod memory;
mod search;

pub use connection::{ConnectionOptions, ConnectionSuggestion, ConnectionType};
pub use graph::{GraphEdge, GraphNode, GraphStats, KnowledgeGraph};
pub use memory::{AccessUpdate, DEFAULT_IMPORTANCE, MemoryId, MemoryRecord, Scope};
pub use search::{
    ScoredCandidate, SearchFilter, SearchOptions, SearchRequest, SearchWeights, VectorStatus,
};
