//! Reference information-gathering agent (§4.4): multi-query generation, dedup,
//! retry-and-breaker-gated execution, and synthesis.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nexus_core::{
    metadata_keys, retry_with_backoff, AgentResult, AgentType, CircuitBreaker, Message,
    MetadataValue, RetryConfig, RetryOutcome, RetryableError, SearchRecency, SearchRequest,
    SearchResults,
};
use nexus_llm::{GenerateOptions, LlmProvider};
use nexus_search::{SearchError, SearchProvider};

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::template::{self, ConfidenceTemplate};

const KEYWORDS: &[&str] = &["search", "look up", "find out", "latest", "current", "news"];

const QUERY_GENERATION_PROMPT: &str = "Produce a JSON array of 1 to 3 search queries for \
the user's question. Use exactly one query unless the question clearly asks about \
disjoint topics. Respond with only the JSON array, nothing else.";

impl RetryableError for SearchError {
    fn type_name(&self) -> &str {
        self.classifier_input().0
    }
}

/// Durations and failure counts for one invocation, recorded into `AgentResult.metadata`
/// (§4.4 telemetry).
#[derive(Debug, Default)]
struct Telemetry {
    query_generation_ms: u64,
    search_ms: u64,
    synthesis_ms: u64,
    failed_queries: u32,
}

impl Telemetry {
    fn into_metadata(self) -> nexus_core::Metadata {
        let mut metadata = nexus_core::Metadata::new();
        metadata.insert("query_generation_ms".to_string(), MetadataValue::Number(self.query_generation_ms as f64));
        metadata.insert("search_ms".to_string(), MetadataValue::Number(self.search_ms as f64));
        metadata.insert("synthesis_ms".to_string(), MetadataValue::Number(self.synthesis_ms as f64));
        metadata.insert("failed_queries".to_string(), MetadataValue::Number(self.failed_queries as f64));
        metadata
    }
}

pub struct WebSearchAgent {
    llm: Arc<dyn LlmProvider>,
    search: Arc<dyn SearchProvider>,
    max_results: u32,
    retry_config: RetryConfig,
    circuit_breaker: CircuitBreaker,
}

impl WebSearchAgent {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchProvider>,
        max_results: u32,
        retry_config: RetryConfig,
        circuit_breaker: CircuitBreaker,
    ) -> Self {
        Self { llm, search, max_results, retry_config, circuit_breaker }
    }

    async fn generate_queries(&self, message: &str) -> Vec<String> {
        let messages = [Message::system(QUERY_GENERATION_PROMPT), Message::user(message)];
        let response = match self.llm.generate(&messages, GenerateOptions::default()).await {
            Ok(r) => r.content,
            Err(e) => {
                tracing::debug!(error = %e, "query generation call failed, falling back to heuristic");
                return vec![heuristic_query(message)];
            }
        };

        match extract_json_array(&response) {
            Some(queries) if !queries.is_empty() => queries,
            _ => {
                tracing::debug!("could not parse query array from llm output, falling back to heuristic");
                vec![heuristic_query(message)]
            }
        }
    }

    async fn execute_query(&self, query: &str) -> Result<(String, SearchResults), ()> {
        let request = match SearchRequest::new(query, self.max_results) {
            Ok(r) => r.with_recency(SearchRecency::NoLimit),
            Err(e) => {
                tracing::warn!(query, error = %e, "skipping invalid search query");
                return Err(());
            }
        };

        let search = self.search.clone();
        let outcome = retry_with_backoff(
            move || {
                let search = search.clone();
                let request = request.clone();
                async move { search.search(request).await }
            },
            &self.retry_config,
            Some(&self.circuit_breaker),
            "web_search",
        )
        .await;

        match outcome {
            Ok((results, _stats)) => Ok((query.to_string(), results)),
            Err(RetryOutcome::CircuitOpen { .. }) => {
                tracing::warn!(query, "search circuit breaker open, skipping query");
                Err(())
            }
            Err(RetryOutcome::Failed(e)) => {
                tracing::warn!(query, error = %e, "search query failed after retries");
                Err(())
            }
        }
    }

    async fn synthesize(
        &self,
        message: &str,
        pairs: &[(String, SearchResults)],
    ) -> Result<(String, Option<String>), AgentError> {
        let has_results = pairs.iter().any(|(_, r)| !r.is_empty());

        let context_block = if has_results {
            let mut block = String::new();
            for (query, results) in pairs {
                if results.is_empty() {
                    continue;
                }
                block.push_str(&format!("Query: {}\n", query));
                block.push_str(&results.to_text(Some(self.max_results as usize)));
                block.push('\n');
            }
            Some(block)
        } else {
            None
        };

        let (system_prompt, user_turn) = if let Some(block) = &context_block {
            (
                "Answer the user's question using the search results below. Cite sources by \
                 link when relevant."
                    .to_string(),
                format!("{}\n\nSearch results:\n{}", message, block),
            )
        } else {
            (
                "The web search did not return usable results. Apologize briefly and answer \
                 from general knowledge, noting the answer may be out of date."
                    .to_string(),
                message.to_string(),
            )
        };

        let messages = [Message::system(system_prompt), Message::user(user_turn)];
        let response = self.llm.generate(&messages, GenerateOptions::default()).await?;
        Ok((response.content, context_block))
    }
}

#[async_trait]
impl Agent for WebSearchAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::WebSearch
    }

    fn system_prompt(&self) -> &str {
        "You answer questions by searching the web and synthesizing the results."
    }

    fn can_handle(&self, message: &str, context: &AgentContext) -> f32 {
        template::score(message, context, &ConfidenceTemplate::default(), KEYWORDS, &[])
    }

    async fn process(
        &self,
        message: &str,
        _context: &AgentContext,
        _history: &[Message],
    ) -> Result<AgentResult, AgentError> {
        let mut telemetry = Telemetry::default();

        let generation_start = Instant::now();
        let raw_queries = self.generate_queries(message).await;
        telemetry.query_generation_ms = generation_start.elapsed().as_millis() as u64;

        let queries = dedup_queries(&raw_queries);

        let search_start = Instant::now();
        let mut pairs = Vec::with_capacity(queries.len());
        for query in &queries {
            match self.execute_query(query).await {
                Ok(pair) => pairs.push(pair),
                Err(()) => telemetry.failed_queries += 1,
            }
        }
        telemetry.search_ms = search_start.elapsed().as_millis() as u64;

        let has_results = pairs.iter().any(|(_, r)| !r.is_empty());

        let synthesis_start = Instant::now();
        let (text, context_block) = self.synthesize(message, &pairs).await?;
        telemetry.synthesis_ms = synthesis_start.elapsed().as_millis() as u64;

        let mut metadata = telemetry.into_metadata();
        if let Some(context_block) = context_block {
            let sources: Vec<MetadataValue> = pairs
                .iter()
                .flat_map(|(_, r)| r.results.iter())
                .map(|r| MetadataValue::Text(r.link.clone()))
                .collect();
            metadata.insert(metadata_keys::SOURCES.to_string(), MetadataValue::List(sources));
            metadata.insert(
                metadata_keys::SEARCH_QUERIES.to_string(),
                MetadataValue::List(queries.iter().map(|q| MetadataValue::Text(q.clone())).collect()),
            );
            metadata.insert(metadata_keys::SEARCH_RESULTS.to_string(), MetadataValue::Text(context_block));
        }

        let mut result = AgentResult::new(text, AgentType::WebSearch).with_metadata(metadata);
        if !has_results {
            result = result.with_confidence(0.5);
        }
        Ok(result)
    }
}

/// Regex-free extraction of the outermost `[...]` span, tolerating prose around it.
fn extract_json_array(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    let candidate = &text[start..=end];
    serde_json::from_str::<Vec<String>>(candidate).ok()
}

const FILLER_WORDS: &[&str] = &[
    "what", "is", "the", "are", "how", "do", "does", "can", "you", "please", "tell", "me", "about",
];

fn heuristic_query(message: &str) -> String {
    let cleaned: Vec<&str> = message
        .split_whitespace()
        .filter(|w| !FILLER_WORDS.contains(&w.to_lowercase().trim_matches(|c: char| !c.is_alphanumeric())))
        .collect();
    if cleaned.is_empty() {
        message.trim().to_string()
    } else {
        cleaned.join(" ")
    }
}

fn normalize(query: &str) -> HashSet<String> {
    query.to_lowercase().split_whitespace().map(|s| s.to_string()).collect()
}

fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Drop queries whose token set is > 0.7 Jaccard-similar to one already kept, preserving
/// the first occurrence's casing. If every query is dropped, keep the first (§4.4).
fn dedup_queries(queries: &[String]) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    let mut kept_tokens: Vec<HashSet<String>> = Vec::new();

    for query in queries {
        let tokens = normalize(query);
        let is_duplicate = kept_tokens.iter().any(|existing| jaccard_similarity(existing, &tokens) > 0.7);
        if !is_duplicate {
            kept.push(query.clone());
            kept_tokens.push(tokens);
        }
    }

    if kept.is_empty() {
        if let Some(first) = queries.first() {
            kept.push(first.clone());
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_array_surrounded_by_prose() {
        let text = "Here are the queries:\n[\"rust async runtimes\", \"tokio vs async-std\"]\nHope that helps.";
        let queries = extract_json_array(text).unwrap();
        assert_eq!(queries, vec!["rust async runtimes", "tokio vs async-std"]);
    }

    #[test]
    fn malformed_array_returns_none() {
        assert!(extract_json_array("no brackets here").is_none());
    }

    #[test]
    fn near_duplicate_queries_are_dropped() {
        let queries = vec!["rust async runtime".to_string(), "async runtime rust".to_string()];
        let deduped = dedup_queries(&queries);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0], "rust async runtime");
    }

    #[test]
    fn distinct_queries_are_both_kept() {
        let queries = vec!["rust async runtime".to_string(), "weather in berlin".to_string()];
        assert_eq!(dedup_queries(&queries).len(), 2);
    }

    #[test]
    fn heuristic_query_strips_filler_words() {
        let q = heuristic_query("What is the current price of bitcoin?");
        assert!(q.contains("bitcoin"));
        assert!(!q.to_lowercase().contains("what"));
    }
}
