//! Configuration management.
//!
//! Configuration is read from TOML, then overridden by `MEMWEAVE_*`
//! environment variables. Every section is optional.
//!
//! ```toml
//! [search]
//! vector_weight = 0.7
//! keyword_weight = 0.3
//! threshold = 0.0
//! limit = 5
//! hybrid = true
//!
//! [connections]
//! limit = 10
//! threshold = 0.6
//! max_topics = 5
//! graph_limit = 5
//!
//! [embedding]
//! dimensions = 384
//! max_concurrent = 4
//!
//! [logging]
//! format = "json"
//! level = "info"
//! ```

use crate::analysis::{DEFAULT_MAX_TOPICS, ResilientAnalyzer};
use crate::embedding::Embedder;
use crate::models::{ConnectionOptions, SearchOptions, SearchWeights};
use crate::services::{
    ConnectionService, DEFAULT_CONNECTIONS_PER_MEMORY, DEFAULT_MAX_CONCURRENT_EMBEDDINGS,
    RecallService,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const APP_DIR: &str = "memweave";
const CONFIG_FILE: &str = "config.toml";

/// Search ranking defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight of the vector similarity in hybrid mode.
    pub vector_weight: f32,
    /// Weight of the lexical score in hybrid mode.
    pub keyword_weight: f32,
    /// Inclusive cutoff on the final score.
    pub threshold: f32,
    /// Maximum number of results.
    pub limit: usize,
    /// Whether to blend lexical scores.
    pub hybrid: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let defaults = SearchOptions::default();
        Self {
            vector_weight: defaults.weights.vector,
            keyword_weight: defaults.weights.keyword,
            threshold: defaults.threshold,
            limit: defaults.limit,
            hybrid: defaults.hybrid,
        }
    }
}

impl SearchConfig {
    /// Converts to per-call search options.
    #[must_use]
    pub const fn to_options(&self) -> SearchOptions {
        SearchOptions {
            limit: self.limit,
            threshold: self.threshold,
            hybrid: self.hybrid,
            weights: SearchWeights::new(self.vector_weight, self.keyword_weight),
        }
    }
}

/// Connection inference defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Maximum suggestions per source record.
    pub limit: usize,
    /// Candidate relevance cutoff and minimum graph edge strength.
    pub threshold: f32,
    /// Topics extracted per record.
    pub max_topics: usize,
    /// Connections explored per record when building a graph.
    pub graph_limit: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let defaults = ConnectionOptions::default();
        Self {
            limit: defaults.limit,
            threshold: defaults.threshold,
            max_topics: DEFAULT_MAX_TOPICS,
            graph_limit: DEFAULT_CONNECTIONS_PER_MEMORY,
        }
    }
}

impl ConnectionConfig {
    /// Converts to per-call connection options.
    #[must_use]
    pub const fn to_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            limit: self.limit,
            threshold: self.threshold,
        }
    }

    /// Converts to knowledge graph options: `graph_limit` per record at `threshold`.
    #[must_use]
    pub const fn to_graph_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            limit: self.graph_limit,
            threshold: self.threshold,
        }
    }
}

/// Embedding settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Required dimensionality; unchecked when absent.
    pub dimensions: Option<usize>,
    /// Candidate embeddings computed concurrently.
    pub max_concurrent: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT_EMBEDDINGS,
        }
    }
}

/// Logging section as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `"pretty"` or `"json"`.
    pub format: Option<String>,
    /// Filter directive used when no environment filter is set.
    pub level: Option<String>,
    /// Log file path; stderr when absent.
    pub file: Option<PathBuf>,
}

/// Main configuration for memweave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Search defaults.
    pub search: SearchConfig,
    /// Connection defaults.
    pub connections: ConnectionConfig,
    /// Embedding settings.
    pub embedding: EmbeddingConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/memweave/`. Returns
    /// defaults if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join(APP_DIR).join(CONFIG_FILE),
            base_dirs
                .home_dir()
                .join(".config")
                .join(APP_DIR)
                .join(CONFIG_FILE),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    /// Applies `MEMWEAVE_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(val) = parsed("MEMWEAVE_VECTOR_WEIGHT")
            && let Ok(weight) = val.parse()
        {
            self.search.vector_weight = weight;
        }
        if let Some(val) = parsed("MEMWEAVE_KEYWORD_WEIGHT")
            && let Ok(weight) = val.parse()
        {
            self.search.keyword_weight = weight;
        }
        if let Some(val) = parsed("MEMWEAVE_THRESHOLD")
            && let Ok(threshold) = val.parse()
        {
            self.search.threshold = threshold;
        }
        if let Some(val) = parsed("MEMWEAVE_LIMIT")
            && let Ok(limit) = val.parse()
        {
            self.search.limit = limit;
        }
        if let Some(val) = parsed("MEMWEAVE_HYBRID")
            && let Some(hybrid) = parse_bool(&val)
        {
            self.search.hybrid = hybrid;
        }
        if let Some(val) = parsed("MEMWEAVE_CONNECTION_LIMIT")
            && let Ok(limit) = val.parse()
        {
            self.connections.limit = limit;
        }
        if let Some(val) = parsed("MEMWEAVE_CONNECTION_THRESHOLD")
            && let Ok(threshold) = val.parse()
        {
            self.connections.threshold = threshold;
        }
        if let Some(val) = parsed("MEMWEAVE_GRAPH_LIMIT")
            && let Ok(limit) = val.parse()
        {
            self.connections.graph_limit = limit;
        }
        if let Some(val) = parsed("MEMWEAVE_EMBEDDING_DIMENSIONS")
            && let Ok(dimensions) = val.parse()
        {
            self.embedding.dimensions = Some(dimensions);
        }
        if let Some(val) = parsed("MEMWEAVE_EMBEDDING_MAX_CONCURRENT")
            && let Ok(max) = val.parse()
        {
            self.embedding.max_concurrent = max;
        }
        if let Some(val) = parsed("MEMWEAVE_LOG_FORMAT") {
            self.logging.format = Some(val);
        }

        self
    }

    /// Checks every section for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.search.to_options().validate()?;
        self.connections.to_options().validate()?;
        self.connections.to_graph_options().validate()?;
        if self.embedding.dimensions == Some(0) {
            return Err(Error::InvalidInput(
                "embedding dimensions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds a recall service over `embedder` using the embedding section.
    #[must_use]
    pub fn recall_service(&self, embedder: Arc<dyn Embedder>) -> RecallService {
        let service =
            RecallService::new(embedder).with_max_concurrent(self.embedding.max_concurrent);
        match self.embedding.dimensions {
            Some(dimensions) => service.with_dimensions(dimensions),
            None => service,
        }
    }

    /// Builds a connection service using the search and connection sections.
    #[must_use]
    pub fn connection_service(&self, analyzer: ResilientAnalyzer) -> ConnectionService {
        ConnectionService::new(analyzer.with_max_topics(self.connections.max_topics))
            .with_search_options(self.search.to_options())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_option_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search.to_options(), SearchOptions::default());
        assert_eq!(config.connections.to_options(), ConnectionOptions::default());
        assert_eq!(config.connections.max_topics, 5);
        assert!(config.embedding.dimensions.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str(
            "[search]\nlimit = 20\nhybrid = false\n\n[embedding]\ndimensions = 384\n",
        )
        .unwrap();
        assert_eq!(config.search.limit, 20);
        assert!(!config.search.hybrid);
        assert!((config.search.vector_weight - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.embedding.dimensions, Some(384));
        assert_eq!(config.connections.limit, 10);
    }

    #[test]
    fn test_invalid_toml_is_operation_failed() {
        let err = EngineConfig::from_toml_str("[search\nlimit = ").unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[connections]\nthreshold = 0.4\n").unwrap();
        let config = EngineConfig::load_from_file(&path).unwrap();
        assert!((config.connections.threshold - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EngineConfig::load_from_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MEMWEAVE_VECTOR_WEIGHT", "0.5"),
            ("MEMWEAVE_KEYWORD_WEIGHT", "0.5"),
            ("MEMWEAVE_LIMIT", "12"),
            ("MEMWEAVE_HYBRID", "off"),
            ("MEMWEAVE_CONNECTION_THRESHOLD", "0.3"),
            ("MEMWEAVE_GRAPH_LIMIT", "8"),
            ("MEMWEAVE_EMBEDDING_DIMENSIONS", "768"),
            ("MEMWEAVE_THRESHOLD", "not-a-number"),
            ("MEMWEAVE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::default()
            .with_overrides_from(|key| vars.get(key).map(|v| (*v).to_string()));

        assert!((config.search.vector_weight - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.search.limit, 12);
        assert!(!config.search.hybrid);
        assert!(config.search.threshold.abs() < f32::EPSILON);
        assert!((config.connections.threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.connections.graph_limit, 8);
        assert_eq!(config.embedding.dimensions, Some(768));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_graph_options_use_graph_limit() {
        let config = EngineConfig::from_toml_str(
            "[connections]\nlimit = 10\ngraph_limit = 2\nthreshold = 0.4\n",
        )
        .unwrap();
        let options = config.connections.to_graph_options();
        assert_eq!(options.limit, 2);
        assert!((options.threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.connections.to_options().limit, 10);
        assert_eq!(EngineConfig::default().connections.graph_limit, 5);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = EngineConfig::default();
        config.search.vector_weight = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.embedding.dimensions = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_recall_service_uses_dimensions() {
        let mut config = EngineConfig::default();
        config.embedding.dimensions = Some(16);
        let service = config.recall_service(Arc::new(crate::embedding::FallbackEmbedder::new()));
        assert_eq!(service.dimensions(), Some(16));
    }
}
