//! Value types for the search provider interface (§6). The provider trait itself lives in
//! the `nexus-search` crate; these are the shared request/response shapes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time filter applied by a search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchRecency {
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
    NoLimit,
}

impl Default for SearchRecency {
    fn default() -> Self {
        SearchRecency::NoLimit
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchRequestError {
    #[error("search query cannot be empty")]
    EmptyQuery,
    #[error("count must be between 1 and 50, got {0}")]
    CountOutOfRange(u32),
}

/// A validated search request. Construction is the only place `count`/`query` are checked;
/// once built, callers never need to re-validate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub count: u32,
    pub recency: SearchRecency,
    pub domain_filter: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, count: u32) -> Result<Self, SearchRequestError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SearchRequestError::EmptyQuery);
        }
        if !(1..=50).contains(&count) {
            return Err(SearchRequestError::CountOutOfRange(count));
        }
        Ok(Self { query, count, recency: SearchRecency::default(), domain_filter: None })
    }

    pub fn with_recency(mut self, recency: SearchRecency) -> Self {
        self.recency = recency;
        self
    }

    pub fn with_domain_filter(mut self, domain: impl Into<String>) -> Self {
        self.domain_filter = Some(domain.into());
        self
    }
}

/// A single ranked result from a search provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    pub link: String,
    pub media: Option<String>,
    pub icon: Option<String>,
    pub refer: Option<String>,
    pub publish_date: Option<String>,
}

/// A bundle of results returned for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    pub query: String,
    pub total: Option<u32>,
    pub search_id: Option<String>,
    pub created: Option<i64>,
}

impl SearchResults {
    pub fn empty(query: impl Into<String>) -> Self {
        Self { results: Vec::new(), query: query.into(), total: None, search_id: None, created: None }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn to_text(&self, max_results: Option<usize>) -> String {
        let slice: &[SearchResult] = match max_results {
            Some(n) => &self.results[..self.results.len().min(n)],
            None => &self.results,
        };
        if slice.is_empty() {
            return format!("No results found for: {}", self.query);
        }
        let mut lines = vec![format!("Search results for: {}\n", self.query)];
        for (i, result) in slice.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, result.title));
            lines.push(format!("   {}", result.content));
            lines.push(format!("   Source: {}", result.link));
            if let Some(media) = &result.media {
                lines.push(format!("   Site: {}", media));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_rejected() {
        assert_eq!(SearchRequest::new("  ", 10), Err(SearchRequestError::EmptyQuery));
    }

    #[test]
    fn count_out_of_range_is_rejected_at_construction() {
        assert_eq!(SearchRequest::new("rust", 0), Err(SearchRequestError::CountOutOfRange(0)));
        assert_eq!(SearchRequest::new("rust", 51), Err(SearchRequestError::CountOutOfRange(51)));
        assert!(SearchRequest::new("rust", 50).is_ok());
    }

    #[test]
    fn to_text_reports_no_results() {
        let r = SearchResults::empty("weather");
        assert!(r.to_text(None).contains("No results found"));
    }
}
