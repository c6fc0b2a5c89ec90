//! Response envelope returned by an LLM provider.

use serde::{Deserialize, Serialize};

/// Token accounting for a single generation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }
    }
}

/// Why the provider stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other,
}

/// Result of one `generate` call against an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model_id: String,
    pub usage: Option<Usage>,
    pub finish_reason: Option<FinishReason>,
    /// Opaque provider-specific payload, kept for debugging only.
    pub raw: Option<serde_json::Value>,
}

impl LlmResponse {
    pub fn new(content: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self { content: content.into(), model_id: model_id.into(), usage: None, finish_reason: None, raw: None }
    }

    pub fn total_tokens(&self) -> Option<u32> {
        self.usage.map(|u| u.total_tokens)
    }
}
