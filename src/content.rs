// src/content.rs
//! `ContentItem`: one fetched record (a repository or a post) as a loose JSON map.
//!
//! Sources disagree on field names and shapes, so items stay schemaless and the
//! pipeline only reads the handful of fields it needs through typed accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field written by the relevance scorer.
pub const RELEVANCE_SCORE: &str = "relevance_score";
/// Field consulted by the popularity and balanced ranking strategies.
pub const POPULARITY_SCORE: &str = "popularity_score";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItem(Map<String, Value>);

impl ContentItem {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert, handy for clients and tests.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// String field, or `None` when absent / not a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Numeric field as f64. Numeric strings are accepted; anything else is `None`.
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Numeric field with the "absent counts as zero" rule used by ranking.
    pub fn score(&self, key: &str) -> f64 {
        self.f64_field(key).unwrap_or(0.0)
    }

    /// Stores a float. Non-finite values are not representable in JSON and become 0.0.
    pub fn set_f64(&mut self, key: &str, value: f64) {
        let v = if value.is_finite() { value } else { 0.0 };
        self.0.insert(key.to_string(), Value::from(v));
    }

    pub fn relevance_score(&self) -> f64 {
        self.score(RELEVANCE_SCORE)
    }

    pub fn popularity_score(&self) -> f64 {
        self.score(POPULARITY_SCORE)
    }

    /// Identity used for deduplication: the `id` field rendered as a string.
    pub fn identity(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// `title` for posts, `name` for repositories.
    pub fn display_title(&self) -> &str {
        self.str_field("title")
            .or_else(|| self.str_field("name"))
            .unwrap_or("N/A")
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ContentItem {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
