//! Model-backed topic and importance analysis.

use super::{ContentAnalysis, TopicImportanceProvider};
use crate::llm::{LlmProvider, extract_json_object};
use crate::{Error, Result};
use serde::Deserialize;

const ANALYSIS_SYSTEM_PROMPT: &str = "You analyze business knowledge snippets. \
Extract the key topics of the text and rate its strategic importance between 0.0 and 1.0. \
Respond with only a JSON object of the form {\"topics\": [\"...\"], \"importance\": 0.5}.";

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    topics: Vec<String>,
    importance: f32,
}

/// Analyzer that asks an LLM for topics and importance.
///
/// Fails on transport errors and unparseable responses; wrap it in
/// [`super::ResilientAnalyzer`] to fall back to the heuristics.
pub struct ModelAnalyzer<P: LlmProvider> {
    provider: P,
    max_topics: usize,
}

impl<P: LlmProvider> ModelAnalyzer<P> {
    /// Creates an analyzer over a completion provider.
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            max_topics: super::DEFAULT_MAX_TOPICS,
        }
    }

    /// Sets the number of topics requested and kept.
    #[must_use]
    pub const fn with_max_topics(mut self, max_topics: usize) -> Self {
        self.max_topics = max_topics;
        self
    }

    fn parse_response(&self, response: &str) -> Result<ContentAnalysis> {
        let json = extract_json_object(response).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{} response contained no JSON object",
                self.provider.name()
            ))
        })?;
        let parsed: AnalysisResponse = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("malformed analysis response: {e}")))?;

        if !parsed.importance.is_finite() {
            return Err(Error::InvalidInput(
                "analysis importance is not a number".to_string(),
            ));
        }

        let topics = parsed
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .take(self.max_topics)
            .collect();

        Ok(ContentAnalysis {
            topics,
            importance: parsed.importance.clamp(0.0, 1.0),
        })
    }
}

impl<P: LlmProvider> TopicImportanceProvider for ModelAnalyzer<P> {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn analyze(&self, text: &str) -> Result<ContentAnalysis> {
        let user = format!(
            "Extract up to {} key topics from the following text.\n\n{text}",
            self.max_topics
        );
        let response = self
            .provider
            .complete_with_system(ANALYSIS_SYSTEM_PROMPT, &user)?;
        self.parse_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedProvider(&'static str);

    impl LlmProvider for CannedProvider {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parses_wrapped_json() {
        let analyzer = ModelAnalyzer::new(CannedProvider(
            "Here you go:\n{\"topics\": [\" Launch \", \"budget\"], \"importance\": 0.8}",
        ));
        let analysis = analyzer.analyze("text").unwrap();
        assert_eq!(analysis.topics, vec!["Launch", "budget"]);
        assert!((analysis.importance - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_clamps_importance_and_truncates_topics() {
        let analyzer = ModelAnalyzer::new(CannedProvider(
            r#"{"topics": ["a", "b", "c"], "importance": 3.5}"#,
        ))
        .with_max_topics(2);
        let analysis = analyzer.analyze("text").unwrap();
        assert_eq!(analysis.topics.len(), 2);
        assert!((analysis.importance - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_prose() {
        let analyzer = ModelAnalyzer::new(CannedProvider("I cannot help with that."));
        assert!(matches!(
            analyzer.analyze("text"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_missing_fields() {
        let analyzer = ModelAnalyzer::new(CannedProvider(r#"{"topics": ["a"]}"#));
        assert!(analyzer.analyze("text").is_err());
    }
}
