//! Memory records and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Importance assigned to records whose importance is unknown.
pub const DEFAULT_IMPORTANCE: f32 = 0.5;

/// Unique identifier for a memory record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(String);

impl MemoryId {
    /// Creates a new memory ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Tenant hierarchy keys of a record.
///
/// Only compared for equality when filtering; never interpreted otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    /// Owning tenant.
    pub tenant_id: String,
    /// Optional brand within the tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
    /// Optional customer within the brand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

impl Scope {
    /// Creates a tenant-level scope.
    #[must_use]
    pub fn tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            brand_id: None,
            customer_id: None,
        }
    }

    /// Narrows the scope to a brand.
    #[must_use]
    pub fn with_brand(mut self, brand_id: impl Into<String>) -> Self {
        self.brand_id = Some(brand_id.into());
        self
    }

    /// Narrows the scope to a customer.
    #[must_use]
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

/// A stored knowledge unit.
///
/// Records are read-only snapshots for the engine: scoring and connection
/// inference never mutate them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, stable for the record's lifetime.
    pub id: MemoryId,
    /// Optional short title, used as the graph node label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Text body.
    pub content: String,
    /// Precomputed embedding; absent until computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Topic tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Importance in `[0.0, 1.0]`.
    #[serde(default = "default_importance")]
    pub importance: f32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp (`>= created_at`).
    pub updated_at: DateTime<Utc>,
    /// Tenant hierarchy keys.
    #[serde(flatten)]
    pub scope: Scope,
    /// Number of times the record was returned to a caller.
    #[serde(default)]
    pub access_count: u32,
    /// When the record was last returned to a caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

const fn default_importance() -> f32 {
    DEFAULT_IMPORTANCE
}

impl MemoryRecord {
    /// Creates a record created and updated at `at`, with default importance.
    #[must_use]
    pub fn new(
        id: impl Into<MemoryId>,
        content: impl Into<String>,
        scope: Scope,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: None,
            content: content.into(),
            embedding: None,
            tags: Vec::new(),
            importance: DEFAULT_IMPORTANCE,
            created_at: at,
            updated_at: at,
            scope,
            access_count: 0,
            last_accessed: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the importance.
    #[must_use]
    pub const fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance;
        self
    }

    /// Sets the last update timestamp.
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Returns the embedding if present and non-empty.
    #[must_use]
    pub fn usable_embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref().filter(|e| !e.is_empty())
    }
}

/// Access statistics a caller should persist for a record it returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessUpdate {
    /// The accessed record.
    pub id: MemoryId,
    /// The new access count.
    pub access_count: u32,
    /// The new last-accessed timestamp.
    pub last_accessed: DateTime<Utc>,
}

impl AccessUpdate {
    /// Computes the access updates for records returned by a search.
    #[must_use]
    pub fn for_results(records: &[MemoryRecord], now: DateTime<Utc>) -> Vec<Self> {
        records
            .iter()
            .map(|record| Self {
                id: record.id.clone(),
                access_count: record.access_count.saturating_add(1),
                last_accessed: now,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }

    #[test]
    fn test_record_defaults() {
        let record = MemoryRecord::new("m1", "content", Scope::tenant("t1"), at(100));
        assert_eq!(record.id.as_str(), "m1");
        assert!((record.importance - DEFAULT_IMPORTANCE).abs() < f32::EPSILON);
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.usable_embedding().is_none());
    }

    #[test]
    fn test_empty_embedding_is_not_usable() {
        let record =
            MemoryRecord::new("m1", "content", Scope::tenant("t1"), at(0)).with_embedding(vec![]);
        assert!(record.usable_embedding().is_none());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let json = r#"{
            "id": "m1",
            "content": "launch plan",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "tenant_id": "acme",
            "brand_id": "summer"
        }"#;
        let record: MemoryRecord = serde_json::from_str(json).unwrap();
        assert!((record.importance - 0.5).abs() < f32::EPSILON);
        assert!(record.tags.is_empty());
        assert_eq!(record.scope.brand_id.as_deref(), Some("summer"));
        assert_eq!(record.scope.customer_id, None);
    }

    #[test]
    fn test_access_updates_increment() {
        let mut record = MemoryRecord::new("m1", "c", Scope::tenant("t"), at(0));
        record.access_count = 4;
        let now = at(500);
        let updates = AccessUpdate::for_results(&[record], now);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].access_count, 5);
        assert_eq!(updates[0].last_accessed, now);
    }
}
