//! Generic JSON-shaped metadata carried on an [`crate::AgentResult`].
//!
//! The executor only reads a handful of well-known keys (`search_results`, `sources`,
//! `search_queries`) but agents are free to stash arbitrary telemetry here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<MetadataValue>),
    Map(HashMap<String, MetadataValue>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MetadataValue]> {
        match self {
            MetadataValue::List(v) => Some(v),
            _ => None,
        }
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Flag(b)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Number(n)
    }
}

/// The well-known metadata keys the plan executor threads between steps.
pub mod keys {
    pub const SEARCH_RESULTS: &str = "search_results";
    pub const SEARCH_QUERIES: &str = "search_queries";
    pub const SOURCES: &str = "sources";
    /// Set when the executor substituted `default` for a required step whose
    /// declared agent was absent from the registry.
    pub const FALLBACK: &str = "fallback";
}

pub type Metadata = HashMap<String, MetadataValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_wrap_primitives() {
        assert_eq!(MetadataValue::from("x"), MetadataValue::Text("x".into()));
        assert_eq!(MetadataValue::from(true), MetadataValue::Flag(true));
    }

    #[test]
    fn as_str_only_matches_text_variant() {
        assert_eq!(MetadataValue::Text("a".into()).as_str(), Some("a"));
        assert_eq!(MetadataValue::Number(1.0).as_str(), None);
    }
}
