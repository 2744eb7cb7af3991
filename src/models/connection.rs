//! Typed connections between memory records.

use super::MemoryId;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of relationship inferred between two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// General relationship.
    Related,
    /// Source is a prerequisite for understanding the target.
    Prerequisite,
    /// Source follows up or builds upon the target.
    Followup,
    /// Source contradicts or offers an alternative view to the target.
    Contradicts,
    /// Source provides additional detail on the target.
    Elaborates,
    /// Source summarizes the target.
    Summarizes,
}

impl ConnectionType {
    /// Returns all connection types.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Related,
            Self::Prerequisite,
            Self::Followup,
            Self::Contradicts,
            Self::Elaborates,
            Self::Summarizes,
        ]
    }

    /// Returns the connection type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Prerequisite => "prerequisite",
            Self::Followup => "followup",
            Self::Contradicts => "contradicts",
            Self::Elaborates => "elaborates",
            Self::Summarizes => "summarizes",
        }
    }

    /// Returns a human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Related => "General relationship between memories",
            Self::Prerequisite => "This memory is a prerequisite for understanding the other",
            Self::Followup => "This memory follows up or builds upon the other",
            Self::Contradicts => "This memory contradicts or provides alternative view to the other",
            Self::Elaborates => "This memory provides additional details on the other",
            Self::Summarizes => "This memory summarizes the other",
        }
    }

    /// Parses a connection type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "related" | "relatesto" => Some(Self::Related),
            "prerequisite" => Some(Self::Prerequisite),
            "followup" => Some(Self::Followup),
            "contradicts" => Some(Self::Contradicts),
            "elaborates" => Some(Self::Elaborates),
            "summarizes" => Some(Self::Summarizes),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, weighted, directed relationship suggestion.
///
/// Persistence and deduplication are the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSuggestion {
    /// The record the relationship starts from.
    pub source_id: MemoryId,
    /// The related record.
    pub target_id: MemoryId,
    /// The inferred relationship type.
    pub connection_type: ConnectionType,
    /// Strength in `[0.0, 1.0]`.
    pub strength: f32,
    /// Topics shared by both records, in source-topic order.
    pub common_topics: Vec<String>,
    /// Title of the target, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_title: Option<String>,
    /// Leading excerpt of the target content.
    pub target_preview: String,
}

/// Options for finding connections over a candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Maximum number of suggestions.
    pub limit: usize,
    /// Relevance cutoff applied when retrieving candidates, and the minimum
    /// edge strength when building a graph.
    pub threshold: f32,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            threshold: 0.6,
        }
    }
}

impl ConnectionOptions {
    /// Sets the suggestion limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Checks that the limit is positive and the threshold lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for out-of-range options.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(crate::Error::InvalidInput(
                "connection limit must be at least 1".to_string(),
            ));
        }
        super::search::check_unit("connection threshold", self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_roundtrips_through_parse() {
        for ty in ConnectionType::all() {
            assert_eq!(ConnectionType::parse(ty.as_str()), Some(*ty));
        }
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(
            ConnectionType::parse("Follow-Up"),
            Some(ConnectionType::Followup)
        );
        assert_eq!(ConnectionType::parse("unknown"), None);
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ConnectionType::Contradicts).unwrap_or_default();
        assert_eq!(json, "\"contradicts\"");
    }

    #[test]
    fn test_options_validation() {
        assert!(ConnectionOptions::default().validate().is_ok());
        assert!(ConnectionOptions::default().with_limit(0).validate().is_err());
        assert!(
            ConnectionOptions::default()
                .with_threshold(2.0)
                .validate()
                .is_err()
        );
    }
}
