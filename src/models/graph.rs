//! Knowledge graph output types.

use super::{ConnectionType, MemoryId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A memory record as a graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Record identifier.
    pub id: MemoryId,
    /// Display label: the title, or a content excerpt when untitled.
    pub label: String,
    /// Record importance.
    pub importance: f32,
    /// Record tags.
    pub tags: Vec<String>,
}

/// A directed, typed edge between two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source record.
    pub source: MemoryId,
    /// Target record.
    pub target: MemoryId,
    /// Relationship type.
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    /// Relationship strength.
    pub strength: f32,
}

/// Summary counts for a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of nodes.
    pub memory_count: usize,
    /// Number of edges.
    pub connection_count: usize,
    /// Edge count per connection type.
    pub connection_types: BTreeMap<ConnectionType, usize>,
}

/// Nodes and inferred edges over a candidate pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    /// One node per record.
    pub nodes: Vec<GraphNode>,
    /// Inferred edges.
    pub edges: Vec<GraphEdge>,
    /// Summary counts.
    pub stats: GraphStats,
}

impl KnowledgeGraph {
    /// Creates a graph and computes its stats.
    #[must_use]
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        let mut connection_types = BTreeMap::new();
        for edge in &edges {
            *connection_types.entry(edge.connection_type).or_insert(0) += 1;
        }
        let stats = GraphStats {
            memory_count: nodes.len(),
            connection_count: edges.len(),
            connection_types,
        };
        Self {
            nodes,
            edges,
            stats,
        }
    }

    /// Returns the edges leaving a node.
    pub fn edges_from<'a>(&'a self, id: &'a MemoryId) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges.iter().filter(move |e| &e.source == id)
    }
}
