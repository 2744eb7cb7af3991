//! Connection inference between memory records.
//!
//! Each source/target pair starts as a `related` connection whose strength
//! grows with topic overlap. An ordered table of textual cue rules then
//! overrides the type and strength; rules are applied in sequence and the
//! last match wins. Weak `related` links sharing fewer than two topics are
//! capped.

use super::recall::RecallService;
use crate::analysis::ResilientAnalyzer;
use crate::models::{
    ConnectionOptions, ConnectionSuggestion, ConnectionType, MemoryId, MemoryRecord,
    SearchOptions, SearchRequest,
};
use crate::Result;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// Strength of a `related` connection with no topic overlap.
pub const BASE_RELATED_STRENGTH: f32 = 0.4;

/// Cap applied to `related` connections sharing too few topics.
pub const WEAK_RELATED_CAP: f32 = 0.5;

/// Shared topics needed to escape [`WEAK_RELATED_CAP`].
pub const MIN_SHARED_TOPICS: usize = 2;

/// Characters of target content kept in a suggestion preview.
pub const PREVIEW_CHARS: usize = 100;

/// A textual cue that overrides the inferred connection type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueRule {
    /// Case-insensitive substrings that trigger the rule.
    pub cues: &'static [&'static str],
    /// Connection type assigned on match.
    pub connection_type: ConnectionType,
    /// Strength assigned on match.
    pub strength: f32,
    /// Whether the target content is searched as well as the source.
    pub checks_target: bool,
}

impl CueRule {
    /// Returns true if the rule fires for the given lower-cased contents.
    #[must_use]
    pub fn matches(&self, source_lower: &str, target_lower: &str) -> bool {
        self.cues.iter().any(|cue| {
            source_lower.contains(cue) || (self.checks_target && target_lower.contains(cue))
        })
    }
}

/// Cue rules in application order. Later matches overwrite earlier ones.
pub const CUE_RULES: [CueRule; 5] = [
    CueRule {
        cues: &[
            "however", "but", "instead", "contrary", "disagree", "opposite", "unlike",
        ],
        connection_type: ConnectionType::Contradicts,
        strength: 0.7,
        checks_target: true,
    },
    CueRule {
        cues: &["first", "before", "prior", "foundation", "basis", "fundamental"],
        connection_type: ConnectionType::Prerequisite,
        strength: 0.8,
        checks_target: false,
    },
    CueRule {
        cues: &["next", "then", "after", "followup", "following", "subsequently"],
        connection_type: ConnectionType::Followup,
        strength: 0.8,
        checks_target: false,
    },
    CueRule {
        cues: &["detail", "specifically", "elaborat", "expand", "more on", "further"],
        connection_type: ConnectionType::Elaborates,
        strength: 0.9,
        checks_target: false,
    },
    CueRule {
        cues: &[
            "summary",
            "conclusion",
            "overview",
            "in short",
            "to summarize",
            "in brief",
        ],
        connection_type: ConnectionType::Summarizes,
        strength: 0.9,
        checks_target: false,
    },
];

/// Result of classifying one source/target pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Inferred type.
    pub connection_type: ConnectionType,
    /// Strength in `[0, 1]`.
    pub strength: f32,
    /// Topics present in both records, in source order.
    pub common_topics: Vec<String>,
}

/// Jaccard similarity of two topic lists, `0.0` when both are empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn topic_similarity(source_topics: &[String], target_topics: &[String]) -> f32 {
    let source: HashSet<&str> = source_topics.iter().map(String::as_str).collect();
    let target: HashSet<&str> = target_topics.iter().map(String::as_str).collect();
    let union = source.union(&target).count();
    if union == 0 {
        return 0.0;
    }
    source.intersection(&target).count() as f32 / union as f32
}

/// Classifies the relationship from `source` to `target`.
///
/// Pure and deterministic: depends only on the two texts and topic lists.
#[must_use]
pub fn classify(
    source_content: &str,
    target_content: &str,
    source_topics: &[String],
    target_topics: &[String],
) -> Classification {
    let mut common_topics: Vec<String> = Vec::new();
    for topic in source_topics {
        if target_topics.contains(topic) && !common_topics.contains(topic) {
            common_topics.push(topic.clone());
        }
    }

    let mut connection_type = ConnectionType::Related;
    let mut strength =
        (BASE_RELATED_STRENGTH + topic_similarity(source_topics, target_topics)).min(1.0);

    let source_lower = source_content.to_lowercase();
    let target_lower = target_content.to_lowercase();
    for rule in &CUE_RULES {
        if rule.matches(&source_lower, &target_lower) {
            connection_type = rule.connection_type;
            strength = rule.strength;
        }
    }

    if connection_type == ConnectionType::Related && common_topics.len() < MIN_SHARED_TOPICS {
        strength = strength.min(WEAK_RELATED_CAP);
    }

    Classification {
        connection_type,
        strength,
        common_topics,
    }
}

/// Returns the first [`PREVIEW_CHARS`] characters, with `...` if cut.
#[must_use]
pub fn preview(content: &str) -> String {
    let mut chars = content.char_indices();
    match chars.nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

/// Topics computed once per record of a pool.
///
/// Lets repeated suggestion passes over the same pool reuse one analysis per
/// record instead of re-analyzing every target on every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicIndex {
    topics: HashMap<MemoryId, Vec<String>>,
}

impl TopicIndex {
    /// Returns the indexed topics of a record.
    #[must_use]
    pub fn get(&self, id: &MemoryId) -> Option<&[String]> {
        self.topics.get(id).map(Vec::as_slice)
    }

    /// Returns the number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Service for inferring connections between records.
#[derive(Clone, Default)]
pub struct ConnectionService {
    analyzer: ResilientAnalyzer,
    search: SearchOptions,
}

impl ConnectionService {
    /// Creates a connection service with the given topic analyzer.
    #[must_use]
    pub fn new(analyzer: ResilientAnalyzer) -> Self {
        Self {
            analyzer,
            search: SearchOptions::default(),
        }
    }

    /// Sets the ranking options used when retrieving candidates.
    ///
    /// `limit` and `threshold` are taken from [`ConnectionOptions`] per call;
    /// only the weights and hybrid flag are used from here.
    #[must_use]
    pub const fn with_search_options(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    /// Returns the topic analyzer.
    #[must_use]
    pub const fn analyzer(&self) -> &ResilientAnalyzer {
        &self.analyzer
    }

    /// Analyzes every record of a pool once. Duplicate ids keep the first.
    #[must_use]
    pub fn index_topics(&self, pool: &[MemoryRecord]) -> TopicIndex {
        let mut topics: HashMap<MemoryId, Vec<String>> = HashMap::with_capacity(pool.len());
        for record in pool {
            topics
                .entry(record.id.clone())
                .or_insert_with(|| self.analyzer.topics(&record.content));
        }
        TopicIndex { topics }
    }

    /// Builds the suggestion for one pair given the source's topics.
    #[must_use]
    pub fn analyze_pair(
        &self,
        source: &MemoryRecord,
        source_topics: &[String],
        target: &MemoryRecord,
    ) -> ConnectionSuggestion {
        let target_topics = self.analyzer.topics(&target.content);
        pair_suggestion(source, source_topics, target, &target_topics)
    }

    /// Classifies every target against `source` and ranks the suggestions.
    ///
    /// The source is excluded by id. Suggestions are ordered by strength
    /// descending, ties keeping target order, and truncated to `limit`.
    /// No relevance threshold applies here; [`Self::find_connections`]
    /// retrieves targets from a pool at a threshold first.
    #[must_use]
    pub fn suggest(
        &self,
        source: &MemoryRecord,
        targets: &[MemoryRecord],
        limit: Option<usize>,
    ) -> Vec<ConnectionSuggestion> {
        self.rank(source, targets, limit, None)
    }

    /// Finds and classifies connections for `source` within a pool.
    ///
    /// Retrieves up to `2 * limit` candidates relevant to the source content
    /// at `threshold`, drops the source itself, classifies the first `limit`,
    /// and ranks them by strength.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the options are invalid.
    pub fn find_connections(
        &self,
        recall: &RecallService,
        source: &MemoryRecord,
        pool: &[MemoryRecord],
        options: &ConnectionOptions,
    ) -> Result<Vec<ConnectionSuggestion>> {
        self.find_with(recall, source, pool, options, None)
    }

    /// Like [`Self::find_connections`], reading topics from `index`.
    ///
    /// Records missing from the index are analyzed on the fly.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the options are invalid.
    pub fn find_connections_indexed(
        &self,
        recall: &RecallService,
        source: &MemoryRecord,
        pool: &[MemoryRecord],
        options: &ConnectionOptions,
        index: &TopicIndex,
    ) -> Result<Vec<ConnectionSuggestion>> {
        self.find_with(recall, source, pool, options, Some(index))
    }

    fn find_with(
        &self,
        recall: &RecallService,
        source: &MemoryRecord,
        pool: &[MemoryRecord],
        options: &ConnectionOptions,
        index: Option<&TopicIndex>,
    ) -> Result<Vec<ConnectionSuggestion>> {
        options.validate()?;

        let search = self
            .search
            .with_limit(options.limit.saturating_mul(2))
            .with_threshold(options.threshold);
        let mut request = SearchRequest::new(source.content.clone()).with_options(search);
        if let Some(embedding) = source.usable_embedding() {
            request = request.with_query_embedding(embedding.to_vec());
        }

        let candidates: Vec<MemoryRecord> = recall
            .search(&request, pool)?
            .into_iter()
            .filter(|candidate| candidate.id != source.id)
            .take(options.limit)
            .collect();
        tracing::debug!(
            source = %source.id,
            candidates = candidates.len(),
            "Retrieved connection candidates"
        );

        Ok(self.rank(source, &candidates, Some(options.limit), index))
    }

    #[instrument(
        skip_all,
        fields(operation = "connections.suggest", source = %source.id, targets = targets.len())
    )]
    fn rank(
        &self,
        source: &MemoryRecord,
        targets: &[MemoryRecord],
        limit: Option<usize>,
        index: Option<&TopicIndex>,
    ) -> Vec<ConnectionSuggestion> {
        let source_topics = self.topics_of(source, index);
        let mut suggestions: Vec<ConnectionSuggestion> = targets
            .iter()
            .filter(|target| target.id != source.id)
            .map(|target| {
                pair_suggestion(source, &source_topics, target, &self.topics_of(target, index))
            })
            .collect();

        suggestions.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        if let Some(limit) = limit {
            suggestions.truncate(limit);
        }

        metrics::counter!("memweave_connections_suggested_total")
            .increment(suggestions.len() as u64);
        tracing::debug!(suggested = suggestions.len(), "Connections suggested");
        suggestions
    }

    fn topics_of<'a>(
        &self,
        record: &MemoryRecord,
        index: Option<&'a TopicIndex>,
    ) -> Cow<'a, [String]> {
        match index.and_then(|index| index.get(&record.id)) {
            Some(topics) => Cow::Borrowed(topics),
            None => Cow::Owned(self.analyzer.topics(&record.content)),
        }
    }
}

fn pair_suggestion(
    source: &MemoryRecord,
    source_topics: &[String],
    target: &MemoryRecord,
    target_topics: &[String],
) -> ConnectionSuggestion {
    let classification = classify(&source.content, &target.content, source_topics, target_topics);
    tracing::trace!(
        source = %source.id,
        target = %target.id,
        connection_type = %classification.connection_type,
        strength = classification.strength,
        "Classified pair"
    );
    ConnectionSuggestion {
        source_id: source.id.clone(),
        target_id: target.id.clone(),
        connection_type: classification.connection_type,
        strength: classification.strength,
        common_topics: classification.common_topics,
        target_title: target.title.clone(),
        target_preview: preview(&target.content),
    }
}

impl std::fmt::Debug for ConnectionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionService")
            .field("has_provider", &self.analyzer.has_provider())
            .field("search", &self.search)
            .finish()
    }
}
