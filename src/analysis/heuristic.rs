//! Local topic and importance heuristics.

use super::{ContentAnalysis, TopicImportanceProvider};
use crate::Result;
use std::collections::HashMap;

/// Default number of topics extracted per text.
pub const DEFAULT_MAX_TOPICS: usize = 5;

/// Tokens of this many characters or fewer never become topics.
const MAX_IGNORED_TOKEN_CHARS: usize = 3;

/// Below this many characters a text loses importance.
const SHORT_TEXT_CHARS: usize = 100;

/// Above this many characters a text gains importance.
const LONG_TEXT_CHARS: usize = 500;

const BASE_IMPORTANCE: f32 = 0.5;
const IMPORTANCE_STEP: f32 = 0.1;
const MIN_IMPORTANCE: f32 = 0.1;
const MAX_IMPORTANCE: f32 = 1.0;

static STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "else", "when", "is", "are", "was", "were",
    "be", "been", "being", "have", "has", "had", "do", "does", "did", "done", "to", "from", "by",
    "on", "at", "in", "for", "with", "about", "as", "of", "that", "this", "these", "those", "it",
    "its",
];

static URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "critical",
    "important",
    "key",
    "significant",
    "strategic",
    "priority",
    "essential",
    "crucial",
];

/// Extracts up to `max_topics` topics by word frequency.
///
/// Whitespace tokens are lower-cased; stop words and tokens of three
/// characters or fewer are dropped. Ties in frequency keep first-occurrence
/// order.
#[must_use]
pub fn extract_topics(text: &str, max_topics: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for word in lowered.split_whitespace() {
        if word.chars().count() <= MAX_IGNORED_TOKEN_CHARS || STOP_WORDS.contains(&word) {
            continue;
        }
        match positions.get(word) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(word, counts.len());
                counts.push((word, 1));
            },
        }
    }

    // Stable sort keeps first-occurrence order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(max_topics)
        .map(|(word, _)| word.to_string())
        .collect()
}

/// Estimates importance in `[0.1, 1.0]` from length and urgency keywords.
#[must_use]
pub fn estimate_importance(text: &str) -> f32 {
    let mut score = BASE_IMPORTANCE;

    let length = text.chars().count();
    if length < SHORT_TEXT_CHARS {
        score -= IMPORTANCE_STEP;
    } else if length > LONG_TEXT_CHARS {
        score += IMPORTANCE_STEP;
    }

    let lowered = text.to_lowercase();
    if URGENCY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        score += IMPORTANCE_STEP;
    }

    score.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}

/// Analyzer backed purely by local heuristics. Never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeuristicAnalyzer {
    max_topics: usize,
}

impl HeuristicAnalyzer {
    /// Creates an analyzer extracting [`DEFAULT_MAX_TOPICS`] topics.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_topics: DEFAULT_MAX_TOPICS,
        }
    }

    /// Sets the number of topics extracted.
    #[must_use]
    pub const fn with_max_topics(mut self, max_topics: usize) -> Self {
        self.max_topics = max_topics;
        self
    }

    /// Returns the number of topics extracted.
    #[must_use]
    pub const fn max_topics(&self) -> usize {
        self.max_topics
    }

    /// Runs both heuristics.
    #[must_use]
    pub fn analyze_text(&self, text: &str) -> ContentAnalysis {
        ContentAnalysis {
            topics: extract_topics(text, self.max_topics),
            importance: estimate_importance(text),
        }
    }
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TopicImportanceProvider for HeuristicAnalyzer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn analyze(&self, text: &str) -> Result<ContentAnalysis> {
        Ok(self.analyze_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_topics_ranked_by_frequency() {
        let text = "launch budget launch summer budget launch";
        assert_eq!(extract_topics(text, 5), vec!["launch", "budget", "summer"]);
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let text = "zebra apple mango apple zebra mango";
        assert_eq!(extract_topics(text, 5), vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn test_stop_words_and_short_tokens_dropped() {
        let text = "The cat and the dog were with those about things";
        assert_eq!(extract_topics(text, 5), vec!["things"]);
    }

    #[test]
    fn test_topics_respect_max() {
        let text = "alpha bravo charlie delta echoes foxtrot";
        assert_eq!(extract_topics(text, 2), vec!["alpha", "bravo"]);
        assert!(extract_topics(text, 0).is_empty());
    }

    #[test]
    fn test_topics_are_lowercased() {
        assert_eq!(extract_topics("Marketing MARKETING", 5), vec!["marketing"]);
    }

    #[test_case("a short note", 0.4 ; "short text loses importance")]
    #[test_case("an urgent short note", 0.5 ; "urgency offsets short length")]
    #[test_case("a critical and urgent and key note", 0.5 ; "keyword bonus applies once")]
    fn test_importance_short_texts(text: &str, expected: f32) {
        assert!((estimate_importance(text) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_importance_medium_text_is_base() {
        let text = "x".repeat(200);
        assert!((estimate_importance(&text) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_importance_long_text_with_keyword() {
        let text = format!("{} strategic", "word ".repeat(120));
        assert!((estimate_importance(&text) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_importance_keyword_match_is_case_insensitive_substring() {
        let text = format!("{} KEYSTONE", "x".repeat(150));
        assert!((estimate_importance(&text) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_analyzer_never_fails() {
        let analysis = HeuristicAnalyzer::new().analyze("").unwrap();
        assert!(analysis.topics.is_empty());
        assert!((analysis.importance - 0.4).abs() < 1e-6);
    }
}
