//! Ranking and connection services.
//!
//! Services operate on caller-supplied candidate pools; none of them touch
//! storage.

mod connections;
mod graph;
mod lexical;
mod recall;
mod scoring;

pub use connections::{
    BASE_RELATED_STRENGTH, CUE_RULES, Classification, ConnectionService, CueRule,
    MIN_SHARED_TOPICS, PREVIEW_CHARS, TopicIndex, WEAK_RELATED_CAP, classify, preview,
    topic_similarity,
};
pub use graph::{DEFAULT_CONNECTIONS_PER_MEMORY, KnowledgeGraphBuilder};
pub use lexical::{lexical_score, tokenize};
pub use recall::{DEFAULT_MAX_CONCURRENT_EMBEDDINGS, RecallService};
pub use scoring::{
    IMPORTANCE_FACTOR_BASE, MAX_RECENCY_PENALTY, RECENCY_HORIZON_DAYS, RelevanceScorer,
    importance_factor, recency_factor,
};
