//! Knowledge graph assembly over a candidate pool.
//!
//! # Example
//!
//! ```rust
//! use memweave::embedding::HashEmbedder;
//! use memweave::models::{ConnectionOptions, MemoryRecord, Scope};
//! use memweave::services::{ConnectionService, KnowledgeGraphBuilder, RecallService};
//! use std::sync::Arc;
//!
//! let builder = KnowledgeGraphBuilder::new(
//!     RecallService::new(Arc::new(HashEmbedder::new())),
//!     ConnectionService::default(),
//! )
//! .with_options(ConnectionOptions::default().with_limit(3).with_threshold(0.1));
//!
//! let now = chrono::Utc::now();
//! let pool = vec![
//!     MemoryRecord::new("m1", "launch plan for summer", Scope::tenant("acme"), now),
//!     MemoryRecord::new("m2", "summer launch budget", Scope::tenant("acme"), now),
//! ];
//! let graph = builder.build(&pool)?;
//! assert_eq!(graph.stats.memory_count, 2);
//! # Ok::<(), memweave::Error>(())
//! ```

use super::connections::ConnectionService;
use super::recall::RecallService;
use crate::Result;
use crate::models::{
    ConnectionOptions, GraphEdge, GraphNode, KnowledgeGraph, MemoryRecord,
};
use tracing::instrument;

/// Characters of content used as a label for untitled records.
const LABEL_CHARS: usize = 50;

/// Default number of connections explored per record.
pub const DEFAULT_CONNECTIONS_PER_MEMORY: usize = 5;

/// Builds a [`KnowledgeGraph`] by finding connections for every record.
#[derive(Debug, Clone)]
pub struct KnowledgeGraphBuilder {
    recall: RecallService,
    connections: ConnectionService,
    options: ConnectionOptions,
}

impl KnowledgeGraphBuilder {
    /// Creates a builder exploring [`DEFAULT_CONNECTIONS_PER_MEMORY`] links per record.
    #[must_use]
    pub fn new(recall: RecallService, connections: ConnectionService) -> Self {
        Self {
            recall,
            connections,
            options: ConnectionOptions::default().with_limit(DEFAULT_CONNECTIONS_PER_MEMORY),
        }
    }

    /// Sets the per-record limit and the minimum edge strength.
    #[must_use]
    pub const fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the graph.
    ///
    /// Nodes follow pool order. Edges are grouped by source in pool order and
    /// ordered by strength within a group; only edges with
    /// `strength >= threshold` are kept.
    ///
    /// Missing embeddings and topics are computed once per record up front,
    /// so the provider cost stays linear in the pool size.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the options are invalid.
    #[instrument(skip_all, fields(operation = "graph.build", records = pool.len()))]
    pub fn build(&self, pool: &[MemoryRecord]) -> Result<KnowledgeGraph> {
        self.options.validate()?;

        let nodes: Vec<GraphNode> = pool.iter().map(node_for).collect();

        let embedded = self.recall.embed_pool(pool);
        let topics = self.connections.index_topics(&embedded);

        let mut edges: Vec<GraphEdge> = Vec::new();
        for record in &embedded {
            let suggestions = self.connections.find_connections_indexed(
                &self.recall,
                record,
                &embedded,
                &self.options,
                &topics,
            )?;
            edges.extend(
                suggestions
                    .into_iter()
                    .filter(|s| s.strength >= self.options.threshold)
                    .map(|s| GraphEdge {
                        source: s.source_id,
                        target: s.target_id,
                        connection_type: s.connection_type,
                        strength: s.strength,
                    }),
            );
        }

        let graph = KnowledgeGraph::new(nodes, edges);
        tracing::info!(
            memory_count = graph.stats.memory_count,
            connection_count = graph.stats.connection_count,
            "Built knowledge graph"
        );
        Ok(graph)
    }
}

fn node_for(record: &MemoryRecord) -> GraphNode {
    let label = record
        .title
        .clone()
        .unwrap_or_else(|| record.content.chars().take(LABEL_CHARS).collect());
    GraphNode {
        id: record.id.clone(),
        label,
        importance: record.importance,
        tags: record.tags.clone(),
    }
}
