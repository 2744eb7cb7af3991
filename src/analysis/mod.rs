//! Topic and importance analysis.
//!
//! Two implementations sit behind [`TopicImportanceProvider`]: a model-backed
//! [`ModelAnalyzer`] and the local [`HeuristicAnalyzer`]. [`ResilientAnalyzer`]
//! picks the model when one is configured and drops to the heuristics when it
//! is absent or fails, so callers always get an answer.

mod heuristic;
mod model;

pub use heuristic::{DEFAULT_MAX_TOPICS, HeuristicAnalyzer, estimate_importance, extract_topics};
pub use model::ModelAnalyzer;

use crate::Result;
use crate::models::MemoryRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Topics and importance derived from a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    /// Key topics, most significant first.
    pub topics: Vec<String>,
    /// Importance in `[0.0, 1.0]`.
    pub importance: f32,
}

/// Capability interface for topic and importance providers.
pub trait TopicImportanceProvider: Send + Sync {
    /// The provider name, used in logs.
    fn name(&self) -> &'static str;

    /// Analyzes a text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot produce an analysis.
    fn analyze(&self, text: &str) -> Result<ContentAnalysis>;
}

/// Suggested metadata for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEnrichment {
    /// Suggested tags.
    pub tags: Vec<String>,
    /// Suggested importance.
    pub importance: f32,
}

/// Analyzer that prefers an external provider and falls back to heuristics.
#[derive(Clone)]
pub struct ResilientAnalyzer {
    provider: Option<Arc<dyn TopicImportanceProvider>>,
    fallback: HeuristicAnalyzer,
}

impl ResilientAnalyzer {
    /// Creates an analyzer that only uses the heuristics.
    #[must_use]
    pub const fn heuristic() -> Self {
        Self {
            provider: None,
            fallback: HeuristicAnalyzer::new(),
        }
    }

    /// Creates an analyzer that tries `provider` first.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn TopicImportanceProvider>) -> Self {
        Self {
            provider: Some(provider),
            fallback: HeuristicAnalyzer::new(),
        }
    }

    /// Sets the number of topics kept from either source.
    #[must_use]
    pub const fn with_max_topics(mut self, max_topics: usize) -> Self {
        self.fallback = self.fallback.with_max_topics(max_topics);
        self
    }

    /// Returns true if an external provider is configured.
    #[must_use]
    pub const fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Analyzes a text, never failing.
    ///
    /// Provider topics are trimmed, lower-cased, de-duplicated, and truncated
    /// so they compare with heuristic topics on equal terms.
    #[must_use]
    pub fn analyze_text(&self, text: &str) -> ContentAnalysis {
        let Some(provider) = &self.provider else {
            return self.fallback.analyze_text(text);
        };

        match provider.analyze(text) {
            Ok(analysis) => ContentAnalysis {
                topics: self.normalize_topics(analysis.topics),
                importance: analysis.importance.clamp(0.0, 1.0),
            },
            Err(e) => {
                metrics::counter!("memweave_analysis_fallbacks_total", "provider" => provider.name())
                    .increment(1);
                tracing::warn!(
                    provider = provider.name(),
                    error = %e,
                    "Topic analysis failed, using heuristics"
                );
                self.fallback.analyze_text(text)
            },
        }
    }

    /// Returns the topics of a text.
    #[must_use]
    pub fn topics(&self, text: &str) -> Vec<String> {
        self.analyze_text(text).topics
    }

    /// Suggests tags and importance for a record from its title and content.
    #[must_use]
    pub fn enrich(&self, record: &MemoryRecord) -> RecordEnrichment {
        let text = match &record.title {
            Some(title) => format!("{title} {}", record.content),
            None => record.content.clone(),
        };
        let analysis = self.analyze_text(&text);
        RecordEnrichment {
            tags: analysis.topics,
            importance: analysis.importance,
        }
    }

    fn normalize_topics(&self, topics: Vec<String>) -> Vec<String> {
        let mut normalized: Vec<String> = Vec::with_capacity(topics.len());
        for topic in topics {
            let topic = topic.trim().to_lowercase();
            if !topic.is_empty() && !normalized.contains(&topic) {
                normalized.push(topic);
            }
        }
        normalized.truncate(self.fallback.max_topics());
        normalized
    }
}

impl Default for ResilientAnalyzer {
    fn default() -> Self {
        Self::heuristic()
    }
}

impl TopicImportanceProvider for ResilientAnalyzer {
    fn name(&self) -> &'static str {
        self.provider.as_ref().map_or("heuristic", |p| p.name())
    }

    fn analyze(&self, text: &str) -> Result<ContentAnalysis> {
        Ok(self.analyze_text(text))
    }
}
