//! MCP-over-HTTP search provider (§6).
//!
//! Three sequential JSON-RPC 2.0 calls against the configured endpoint: `initialize`
//! (which returns an `mcp-session-id` header echoed on subsequent calls), `tools/list`,
//! then `tools/call{name, arguments}`. Responses are SSE streams whose `data:` lines
//! carry JSON payloads; the parser keeps the last successfully-parsed payload, matching
//! a single-pass line scan. The aggregate result envelope may be double-encoded JSON.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nexus_core::{SearchRequest, SearchResult, SearchResults};
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::SearchError;
use crate::provider::SearchProvider;

/// Tool names tried in priority order; the first one `tools/list` actually returns wins.
const PREFERRED_TOOL_NAMES: &[&str] =
    &["webSearchPrime", "web_search", "search", "web_search_prime"];

pub struct McpSearchProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    request_id: AtomicI64,
}

impl McpSearchProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self { client, endpoint: endpoint.into(), api_key: api_key.into(), request_id: AtomicI64::new(1) }
    }

    fn next_id(&self) -> i64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn initialize(&self) -> Result<String, SearchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "nexus-assistant", "version": "1.0" }
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json, text/event-stream")
            .json(&body)
            .send()
            .await?;

        let session_id = response
            .headers()
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_default();

        let text = response.text().await?;
        parse_sse_payload(&text)?;
        Ok(session_id)
    }

    async fn list_tools(&self, session_id: &str) -> Result<Vec<String>, SearchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "tools/list",
            "params": {}
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json, text/event-stream")
            .header("mcp-session-id", session_id)
            .json(&body)
            .send()
            .await?;

        let text = response.text().await?;
        let payload = parse_sse_payload(&text)?;

        let tools = payload
            .get("result")
            .and_then(|r| r.get("tools"))
            .and_then(|t| t.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(tools
            .iter()
            .filter_map(|t| t.get("name").and_then(|n| n.as_str()).map(str::to_string))
            .collect())
    }

    fn pick_tool(&self, available: &[String]) -> Option<String> {
        for preferred in PREFERRED_TOOL_NAMES {
            if let Some(found) = available.iter().find(|t| t.as_str() == *preferred) {
                return Some(found.clone());
            }
        }
        available.first().cloned()
    }

    async fn call_tool(
        &self,
        session_id: &str,
        tool: &str,
        request: &SearchRequest,
    ) -> Result<SearchResults, SearchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": "tools/call",
            "params": {
                "name": tool,
                "arguments": {
                    "query": request.query,
                    "count": request.count,
                    "domain_filter": request.domain_filter,
                }
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json, text/event-stream")
            .header("mcp-session-id", session_id)
            .json(&body)
            .send()
            .await?;

        let text = response.text().await?;
        let payload = parse_sse_payload(&text)?;
        parse_search_results(&payload, &request.query)
    }
}

#[async_trait]
impl SearchProvider for McpSearchProvider {
    async fn search(&self, request: SearchRequest) -> Result<SearchResults, SearchError> {
        let session_id = self.initialize().await?;
        let tools = self.list_tools(&session_id).await?;
        let tool = self
            .pick_tool(&tools)
            .ok_or_else(|| SearchError::Provider("no search tool exposed by MCP server".into()))?;
        self.call_tool(&session_id, &tool, &request).await
    }

    fn provider_name(&self) -> &str {
        "mcp_web_search"
    }
}

/// Scan every line of an SSE response body for `data:` payloads, keeping the last one
/// that parses successfully as JSON — matching a single-pass line scan over the stream.
fn parse_sse_payload(body: &str) -> Result<Value, SearchError> {
    let mut last = None;
    for line in body.lines() {
        if let Some(data) = line.strip_prefix("data:") {
            if let Ok(value) = serde_json::from_str::<Value>(data.trim()) {
                last = Some(value);
            }
        }
    }
    // Plain JSON body (no SSE framing) is also accepted.
    last.or_else(|| serde_json::from_str::<Value>(body).ok())
        .ok_or_else(|| SearchError::InvalidResponse("no parseable data: payload in response".into()))
}

/// Unwrap a possibly double-encoded JSON value: a JSON string that itself contains JSON.
fn unwrap_double_encoded(value: Value) -> Value {
    if let Value::String(s) = &value {
        if let Ok(inner) = serde_json::from_str::<Value>(s) {
            return inner;
        }
    }
    value
}

fn parse_search_results(payload: &Value, query: &str) -> Result<SearchResults, SearchError> {
    let content = payload
        .get("result")
        .and_then(|r| r.get("content"))
        .cloned()
        .unwrap_or(Value::Null);

    // tools/call results are typically `{content: [{type: "text", text: "<json>"}]}`.
    let raw_items = if let Some(arr) = content.as_array() {
        arr.iter()
            .filter_map(|c| c.get("text").and_then(|t| t.as_str()))
            .filter_map(|t| serde_json::from_str::<Value>(t).ok())
            .next()
            .unwrap_or(Value::Null)
    } else {
        content
    };
    let raw_items = unwrap_double_encoded(raw_items);

    let items = raw_items
        .get("results")
        .or_else(|| raw_items.get("items"))
        .cloned()
        .unwrap_or(raw_items.clone());

    let items = match items {
        Value::Array(arr) => arr,
        Value::Null => Vec::new(),
        other => vec![other],
    };

    let results: Vec<SearchResult> = items.iter().map(parse_one_result).collect();

    Ok(SearchResults {
        results,
        query: query.to_string(),
        total: raw_items.get("total").and_then(|v| v.as_u64()).map(|v| v as u32),
        search_id: raw_items.get("id").and_then(|v| v.as_str()).map(str::to_string),
        created: raw_items.get("created").and_then(|v| v.as_i64()),
    })
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k).and_then(|v| v.as_str()))
}

fn parse_one_result(value: &Value) -> SearchResult {
    SearchResult {
        title: first_str(value, &["title"]).unwrap_or_default().to_string(),
        content: first_str(value, &["content", "snippet", "summary"]).unwrap_or_default().to_string(),
        link: first_str(value, &["link", "url"]).unwrap_or_default().to_string(),
        media: first_str(value, &["media", "source"]).map(str::to_string),
        icon: first_str(value, &["icon", "favicon"]).map(str::to_string),
        refer: first_str(value, &["refer", "id"]).map(str::to_string),
        publish_date: first_str(value, &["publish_date", "date"]).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_payload_keeps_last_data_line() {
        let body = "event: message\ndata: {\"a\":1}\n\ndata: {\"a\":2}\n";
        let value = parse_sse_payload(body).unwrap();
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn plain_json_body_without_sse_framing_parses() {
        let body = "{\"result\": {\"tools\": []}}";
        let value = parse_sse_payload(body).unwrap();
        assert!(value["result"]["tools"].as_array().unwrap().is_empty());
    }

    #[test]
    fn double_encoded_json_is_unwrapped() {
        let inner = json!({"results": []});
        let wrapped = Value::String(inner.to_string());
        let unwrapped = unwrap_double_encoded(wrapped);
        assert!(unwrapped.get("results").is_some());
    }

    #[test]
    fn result_item_aliases_are_tried_in_order() {
        let item = json!({"title": "t", "snippet": "body", "url": "https://x"});
        let parsed = parse_one_result(&item);
        assert_eq!(parsed.content, "body");
        assert_eq!(parsed.link, "https://x");
    }

    #[test]
    fn pick_tool_prefers_known_names_over_first_available() {
        let provider = McpSearchProvider::new("http://example", "key", Duration::from_secs(1));
        let available = vec!["other_tool".to_string(), "web_search".to_string()];
        assert_eq!(provider.pick_tool(&available), Some("web_search".to_string()));
    }

    #[test]
    fn pick_tool_falls_back_to_first_when_no_preferred_name_present() {
        let provider = McpSearchProvider::new("http://example", "key", Duration::from_secs(1));
        let available = vec!["custom_tool".to_string()];
        assert_eq!(provider.pick_tool(&available), Some("custom_tool".to_string()));
    }

    #[test]
    fn parse_search_results_reads_nested_text_envelope() {
        let payload = json!({
            "result": {
                "content": [
                    { "type": "text", "text": "{\"results\": [{\"title\": \"A\", \"content\": \"b\", \"link\": \"https://a\"}]}" }
                ]
            }
        });
        let results = parse_search_results(&payload, "q").unwrap();
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.results[0].title, "A");
    }
}
