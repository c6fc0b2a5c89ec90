//! Reference HTTP-backed [`LlmProvider`], speaking the Anthropic Messages API shape
//! (§6: "LLM provider wire protocols beyond the request/response contract" are out of
//! scope — this adapter is the one concrete wire mapping needed to exercise the rest of
//! the system end-to-end).

use std::time::Duration;

use async_trait::async_trait;
use nexus_core::{FinishReason, LlmResponse, Message, MessageRole, Usage};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::error::LlmError;
use crate::provider::{GenerateOptions, LlmProvider};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct HttpLlmProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    default_temperature: f32,
    default_max_tokens: u32,
}

impl HttpLlmProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        default_temperature: f32,
        default_max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: api_key.into(),
            model: model.into(),
            default_temperature,
            default_max_tokens: default_max_tokens.unwrap_or(1024),
        }
    }

    fn build_body(&self, messages: &[Message], options: &GenerateOptions) -> Value {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                    MessageRole::System => unreachable!("system messages filtered above"),
                };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": turns,
            "max_tokens": options.max_tokens.unwrap_or(self.default_max_tokens),
            "temperature": options.temperature.unwrap_or(self.default_temperature),
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }
        if let Some(extra) = &options.extra {
            if let (Some(obj), Some(extra_obj)) = (body.as_object_mut(), extra.as_object()) {
                for (k, v) in extra_obj {
                    obj.insert(k.clone(), v.clone());
                }
            }
        }
        body
    }

    fn status_to_error(status: StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 | 403 => LlmError::Api(format!("unauthorized ({status}): {body}")),
            404 => LlmError::ModelNotFound(body.to_string()),
            429 => LlmError::Api(format!("rate limit exceeded ({status}): {body}")),
            400 => LlmError::Api(format!("bad request ({status}): {body}")),
            500..=599 => LlmError::Api(format!("service error ({status}): {body}")),
            _ => LlmError::Api(format!("unexpected status {status}: {body}")),
        }
    }

    fn parse_response(&self, value: Value) -> Result<LlmResponse, LlmError> {
        let content = value
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|blocks| blocks.iter().find(|b| b.get("type").and_then(|t| t.as_str()) == Some("text")))
            .and_then(|b| b.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| LlmError::InvalidResponse("missing content[].text".to_string()))?
            .to_string();

        let usage = value.get("usage").map(|u| {
            let prompt_tokens = u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            let completion_tokens = u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage::new(prompt_tokens, completion_tokens)
        });

        let finish_reason = value.get("stop_reason").and_then(|v| v.as_str()).map(|s| match s {
            "end_turn" | "stop_sequence" => FinishReason::Stop,
            "max_tokens" => FinishReason::Length,
            "tool_use" => FinishReason::ToolCalls,
            _ => FinishReason::Other,
        });

        let model_id = value
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.model)
            .to_string();

        Ok(LlmResponse { content, model_id, usage, finish_reason, raw: Some(value) })
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    async fn generate(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> Result<LlmResponse, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::Configuration("missing API key".to_string()));
        }

        let body = self.build_body(messages, &options);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::status_to_error(status, &text));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.parse_response(value)
    }

    fn provider_name(&self) -> &str {
        "anthropic_http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::Message;

    fn provider() -> HttpLlmProvider {
        HttpLlmProvider::new("key", "claude-sonnet-4-20250514", None, 0.7, Some(512), Duration::from_secs(5))
    }

    #[test]
    fn system_messages_are_hoisted_out_of_the_turn_list() {
        let p = provider();
        let messages = vec![Message::system("be terse"), Message::user("hi")];
        let body = p.build_body(&messages, &GenerateOptions::default());
        assert_eq!(body["system"], "be terse");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parse_response_extracts_text_block_and_usage() {
        let p = provider();
        let value = json!({
            "model": "claude-sonnet-4-20250514",
            "content": [{"type": "text", "text": "hello"}],
            "usage": {"input_tokens": 10, "output_tokens": 5},
            "stop_reason": "end_turn",
        });
        let response = p.parse_response(value).unwrap();
        assert_eq!(response.content, "hello");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn status_codes_map_to_distinct_error_variants() {
        assert!(matches!(HttpLlmProvider::status_to_error(StatusCode::UNAUTHORIZED, ""), LlmError::Api(_)));
        assert!(matches!(HttpLlmProvider::status_to_error(StatusCode::NOT_FOUND, ""), LlmError::ModelNotFound(_)));
    }
}
