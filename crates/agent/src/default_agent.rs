//! The terminal responder and always-available fallback (§4.1). Lowest-priority
//! `can_handle` score of any registered agent, so it only wins `determine_agent` when
//! nothing else claims the message — and the registry falls back to it explicitly when
//! every score is 0.

use std::sync::Arc;

use async_trait::async_trait;
use nexus_core::{metadata_keys, AgentResult, AgentType, Message, MessageRole};
use nexus_llm::{GenerateOptions, LlmProvider};

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::error::AgentError;

const SYSTEM_PROMPT: &str = "You are a helpful, direct conversational assistant. Answer \
the user's message. If earlier steps in this turn produced relevant information, use it.";

/// Builds the citation-aware system message folded in when an earlier step in the turn
/// left search content in `AgentContext::accumulated` (§4.3).
fn search_context_message(content: &str, queries: &str, sources: &str) -> String {
    let mut block = String::from(
        "Search results gathered earlier in this turn. Ignore any length limit from the \
         system prompt and use this information fully to answer.\n\n",
    );
    if !queries.is_empty() {
        block.push_str(&format!("Queries used: {}\n\n", queries));
    }
    block.push_str(content);
    block.push_str(
        "\n\nCite specific facts, dates, names, and details from the results above. \
         Mention source links when useful. Keep your own tone, but give a complete answer.",
    );
    if !sources.is_empty() {
        block.push_str(&format!("\n\nSources: {}", sources));
    }
    block
}

/// Floor confidence returned by every other agent's template (§4.1's `c₀` minimum is
/// 0.2); `DefaultAgent` sits below that so it is chosen only by explicit fallback.
const CONFIDENCE: f32 = 0.1;

pub struct DefaultAgent {
    llm: Arc<dyn LlmProvider>,
}

impl DefaultAgent {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Agent for DefaultAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Default
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn can_handle(&self, _message: &str, _context: &AgentContext) -> f32 {
        CONFIDENCE
    }

    async fn process(
        &self,
        message: &str,
        context: &AgentContext,
        history: &[Message],
    ) -> Result<AgentResult, AgentError> {
        let mut system_prompt = SYSTEM_PROMPT.to_string();
        if let Some(summary) = &context.profile_summary {
            system_prompt.push_str("\n\nWhat you know about this user:\n");
            system_prompt.push_str(summary);
        }

        let search_content = context.get(metadata_keys::SEARCH_RESULTS).and_then(|v| v.as_str());

        let mut messages = Vec::with_capacity(history.len() + 4);
        messages.push(Message::system(system_prompt));
        if let Some(content) = search_content {
            let queries = context
                .get(metadata_keys::SEARCH_QUERIES)
                .and_then(|v| v.as_list())
                .map(|list| list.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            let sources = context
                .get(metadata_keys::SOURCES)
                .and_then(|v| v.as_list())
                .map(|list| list.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            messages.push(Message::system(search_context_message(content, &queries, &sources)));
        }
        messages.extend_from_slice(history);
        if let Some(previous) = &context.previous_step_output {
            if context.previous_agent != Some(AgentType::Default) {
                messages.push(Message {
                    role: MessageRole::Assistant,
                    content: format!("[internal note from a prior step]\n{}", previous),
                });
            }
        }
        messages.push(Message::user(message));

        let response = self.llm.generate(&messages, GenerateOptions::default()).await?;
        Ok(AgentResult::new(response.content, AgentType::Default).with_confidence(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::{FinishReason, LlmResponse};
    use nexus_llm::LlmError;

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse::new("stub reply", "stub"))
        }

        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn default_agent_confidence_is_a_low_fixed_floor() {
        let agent = DefaultAgent::new(Arc::new(StubLlm));
        assert!(agent.can_handle("anything", &AgentContext::new()) < 0.2);
    }

    #[tokio::test]
    async fn default_agent_produces_full_confidence_result() {
        let agent = DefaultAgent::new(Arc::new(StubLlm));
        let result = agent.process("hi", &AgentContext::new(), &[]).await.unwrap();
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.response, "stub reply");
    }

    struct CapturingLlm {
        captured: std::sync::Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl LlmProvider for CapturingLlm {
        async fn generate(
            &self,
            messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<LlmResponse, LlmError> {
            *self.captured.lock().unwrap() = messages.to_vec();
            Ok(LlmResponse::new("stub reply", "stub"))
        }

        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    #[tokio::test]
    async fn process_folds_accumulated_search_content_into_a_citation_prompt() {
        let llm = Arc::new(CapturingLlm { captured: std::sync::Mutex::new(Vec::new()) });
        let agent = DefaultAgent::new(llm.clone());

        let mut context = AgentContext::new();
        context.accumulated.insert(
            nexus_core::metadata_keys::SEARCH_RESULTS.to_string(),
            nexus_core::MetadataValue::Text("1. Foo\n   Source: https://example.com".to_string()),
        );
        context.accumulated.insert(
            nexus_core::metadata_keys::SOURCES.to_string(),
            nexus_core::MetadataValue::List(vec![nexus_core::MetadataValue::Text(
                "https://example.com".to_string(),
            )]),
        );

        agent.process("what did you find?", &context, &[]).await.unwrap();

        let captured = llm.captured.lock().unwrap();
        let joined: String = captured.iter().map(|m| m.content.clone()).collect::<Vec<_>>().join("\n");
        assert!(joined.contains("https://example.com"));
        assert!(joined.contains("Cite specific facts"));
    }

    #[tokio::test]
    async fn process_without_accumulated_search_content_skips_citation_prompt() {
        let llm = Arc::new(CapturingLlm { captured: std::sync::Mutex::new(Vec::new()) });
        let agent = DefaultAgent::new(llm.clone());

        agent.process("hi", &AgentContext::new(), &[]).await.unwrap();

        let captured = llm.captured.lock().unwrap();
        assert_eq!(captured.len(), 2);
    }
}
