//! Concrete specialized agents (§4.1): information-gathering, processing, and the
//! expertise agent. Each wraps an [`LlmProvider`] and scores itself via
//! [`crate::template`].

use std::sync::Arc;

use async_trait::async_trait;
use nexus_core::{metadata_keys, AgentResult, AgentType, Message, Metadata, MetadataValue, SearchRequest};
use nexus_llm::{GenerateOptions, LlmProvider};
use nexus_search::SearchProvider;

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::template::{self, ConfidenceTemplate};

/// Calls the LLM with `system_prompt` plus whatever context the agent chooses to fold
/// into the user turn, returning the raw text as the agent's response.
async fn respond(
    llm: &dyn LlmProvider,
    system_prompt: &str,
    user_turn: &str,
    history: &[Message],
) -> Result<String, AgentError> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend_from_slice(history);
    messages.push(Message::user(user_turn));
    let response = llm.generate(&messages, GenerateOptions::default()).await?;
    Ok(response.content)
}

/// Number of results an information agent asks its source for.
const INFORMATION_AGENT_RESULT_COUNT: u32 = 5;

/// Shared found/not-found branch for the information-gathering agents (§4.1): query the
/// configured source, fold real results into the prompt and `metadata.sources`/
/// `search_results` on a hit, otherwise fall back to a lower-confidence general-knowledge
/// answer with empty-but-present metadata.
async fn gather_and_respond(
    llm: &dyn LlmProvider,
    source: Option<&dyn SearchProvider>,
    system_prompt: &str,
    message: &str,
    history: &[Message],
    agent_type: AgentType,
) -> Result<AgentResult, AgentError> {
    let results = match source {
        Some(provider) => match SearchRequest::new(message, INFORMATION_AGENT_RESULT_COUNT) {
            Ok(request) => match provider.search(request).await {
                Ok(results) if !results.is_empty() => Some(results),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!(error = %e, "source query failed, falling back to general knowledge");
                    None
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "skipping invalid source query");
                None
            }
        },
        None => None,
    };

    match results {
        Some(results) => {
            let content = results.to_text(Some(INFORMATION_AGENT_RESULT_COUNT as usize));
            let turn = format!("{}\n\nRelevant results:\n{}", message, content);
            let text = respond(llm, system_prompt, &turn, history).await?;

            let sources: Vec<MetadataValue> =
                results.results.iter().map(|r| MetadataValue::Text(r.link.clone())).collect();
            let mut metadata = Metadata::new();
            metadata.insert(metadata_keys::SOURCES.to_string(), MetadataValue::List(sources));
            metadata.insert(metadata_keys::SEARCH_RESULTS.to_string(), MetadataValue::Text(content));
            Ok(AgentResult::new(text, agent_type).with_metadata(metadata).with_confidence(0.9))
        }
        None => {
            let text = respond(llm, system_prompt, message, history).await?;
            let mut metadata = Metadata::new();
            metadata.insert(metadata_keys::SOURCES.to_string(), MetadataValue::List(Vec::new()));
            Ok(AgentResult::new(text, agent_type).with_metadata(metadata).with_confidence(0.5))
        }
    }
}

macro_rules! information_agent {
    ($name:ident, $agent_type:expr, $system_prompt:expr, $keywords:expr) => {
        pub struct $name {
            llm: Arc<dyn LlmProvider>,
            source: Option<Arc<dyn SearchProvider>>,
        }

        impl $name {
            pub fn new(llm: Arc<dyn LlmProvider>, source: Option<Arc<dyn SearchProvider>>) -> Self {
                Self { llm, source }
            }
        }

        #[async_trait]
        impl Agent for $name {
            fn agent_type(&self) -> AgentType {
                $agent_type
            }

            fn system_prompt(&self) -> &str {
                $system_prompt
            }

            fn can_handle(&self, message: &str, context: &AgentContext) -> f32 {
                template::score(message, context, &ConfidenceTemplate::default(), $keywords, &[])
            }

            async fn process(
                &self,
                message: &str,
                _context: &AgentContext,
                history: &[Message],
            ) -> Result<AgentResult, AgentError> {
                gather_and_respond(
                    self.llm.as_ref(),
                    self.source.as_deref(),
                    $system_prompt,
                    message,
                    history,
                    $agent_type,
                )
                .await
            }
        }
    };
}

information_agent!(
    KnowledgeBaseAgent,
    AgentType::KnowledgeBase,
    "You answer from the organization's internal knowledge base. Be precise and cite \
     the relevant document when you can.",
    &["knowledge base", "kb", "internal doc", "wiki", "runbook"]
);

information_agent!(
    TechDocsAgent,
    AgentType::TechDocs,
    "You answer questions about technical documentation, APIs, and libraries.",
    &["documentation", "docs", "api reference", "sdk", "manual"]
);

information_agent!(
    CodeAnalysisAgent,
    AgentType::CodeAnalysis,
    "You read and explain source code: what it does, why it might fail, how to fix it.",
    &["code", "function", "bug", "stack trace", "exception", "compile"]
);

information_agent!(
    MetricsAgent,
    AgentType::Metrics,
    "You answer questions about system metrics, dashboards, and performance numbers.",
    &["metric", "latency", "throughput", "dashboard", "p99", "cpu", "memory usage"]
);

information_agent!(
    NewsAgent,
    AgentType::News,
    "You summarize recent news and current events relevant to the user's question.",
    &["news", "latest", "today", "happened", "headline"]
);

const TODOIST_KEYWORDS: &[&str] = &["todo", "task", "reminder", "due date", "checklist"];
const TODOIST_SYSTEM_PROMPT: &str = "You manage the user's tasks and to-do items.";

/// The task-manager's own wire protocol is out of scope (same rationale as the LLM/search
/// provider protocols): this trait is the seam a concrete Todoist client would implement.
#[async_trait]
pub trait TaskProvider: Send + Sync {
    async fn list_open_tasks(&self, user_id: i64) -> Result<Vec<String>, AgentError>;
}

/// Stub used when no concrete task-manager integration is configured.
pub struct NullTaskProvider;

#[async_trait]
impl TaskProvider for NullTaskProvider {
    async fn list_open_tasks(&self, _user_id: i64) -> Result<Vec<String>, AgentError> {
        Ok(Vec::new())
    }
}

pub struct TodoistAgent {
    llm: Arc<dyn LlmProvider>,
    tasks: Arc<dyn TaskProvider>,
}

impl TodoistAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, tasks: Arc<dyn TaskProvider>) -> Self {
        Self { llm, tasks }
    }
}

#[async_trait]
impl Agent for TodoistAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Todoist
    }

    fn system_prompt(&self) -> &str {
        TODOIST_SYSTEM_PROMPT
    }

    fn can_handle(&self, message: &str, context: &AgentContext) -> f32 {
        template::score(message, context, &ConfidenceTemplate::default(), TODOIST_KEYWORDS, &[])
    }

    async fn process(
        &self,
        message: &str,
        context: &AgentContext,
        history: &[Message],
    ) -> Result<AgentResult, AgentError> {
        let open_tasks = self.tasks.list_open_tasks(context.user_profile.as_ref().map_or(0, |p| p.user_id)).await?;
        let turn = if open_tasks.is_empty() {
            message.to_string()
        } else {
            format!("{}\n\nCurrent open tasks:\n- {}", message, open_tasks.join("\n- "))
        };
        let text = respond(self.llm.as_ref(), TODOIST_SYSTEM_PROMPT, &turn, history).await?;

        let mut metadata = Metadata::new();
        metadata.insert(
            metadata_keys::SOURCES.to_string(),
            MetadataValue::List(open_tasks.iter().map(|t| MetadataValue::Text(t.clone())).collect()),
        );
        Ok(AgentResult::new(text, AgentType::Todoist).with_metadata(metadata))
    }
}

macro_rules! processing_agent {
    ($name:ident, $agent_type:expr, $system_prompt:expr, $keywords:expr, $context_keys:expr) => {
        pub struct $name {
            llm: Arc<dyn LlmProvider>,
        }

        impl $name {
            pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
                Self { llm }
            }
        }

        #[async_trait]
        impl Agent for $name {
            fn agent_type(&self) -> AgentType {
                $agent_type
            }

            fn system_prompt(&self) -> &str {
                $system_prompt
            }

            fn can_handle(&self, message: &str, context: &AgentContext) -> f32 {
                let template = ConfidenceTemplate { context_gated: true, ..Default::default() };
                template::score(message, context, &template, $keywords, $context_keys)
            }

            async fn process(
                &self,
                message: &str,
                context: &AgentContext,
                history: &[Message],
            ) -> Result<AgentResult, AgentError> {
                let turn = match &context.previous_step_output {
                    Some(previous) => format!("{}\n\nContext from a previous step:\n{}", message, previous),
                    None => message.to_string(),
                };
                let text = respond(self.llm.as_ref(), $system_prompt, &turn, history).await?;
                Ok(AgentResult::new(text, $agent_type))
            }
        }
    };
}

processing_agent!(
    AnalysisAgent,
    AgentType::Analysis,
    "You analyze the provided information and draw out the key implications.",
    &["analyze", "analysis", "why", "explain"],
    &[metadata_keys::SEARCH_RESULTS]
);

processing_agent!(
    FactCheckAgent,
    AgentType::FactCheck,
    "You check claims against the provided sources and state whether each is supported, \
     contradicted, or unverifiable.",
    &["fact check", "is it true", "verify", "accurate"],
    &[metadata_keys::SEARCH_RESULTS, metadata_keys::SOURCES]
);

processing_agent!(
    ComparisonAgent,
    AgentType::Comparison,
    "You compare the items in the provided information along the dimensions the user \
     cares about.",
    &["compare", "versus", "vs", "difference between"],
    &[metadata_keys::SEARCH_RESULTS]
);

processing_agent!(
    SummaryAgent,
    AgentType::Summary,
    "You produce a concise summary of the provided information.",
    &["summarize", "summary", "tldr", "tl;dr"],
    &[metadata_keys::SEARCH_RESULTS]
);

processing_agent!(
    ClarificationAgent,
    AgentType::Clarification,
    "The user's request is ambiguous. Ask one focused clarifying question.",
    &["clarify", "what do you mean", "unclear"],
    &[metadata_keys::SEARCH_RESULTS]
);

const EXPERTISE_DOMAINS: &[(&str, &[&str])] = &[
    ("security", &["security", "vulnerability", "exploit", "cve", "encryption"]),
    ("legal", &["legal", "contract", "compliance", "gdpr", "liability"]),
    ("finance", &["tax", "invoice", "budget", "revenue", "finance"]),
];

/// Domain-flavored system prompts; the active sub-domain is picked per message from
/// keyword matches rather than fixed at construction (§4.1).
pub struct ExpertiseAgent {
    llm: Arc<dyn LlmProvider>,
}

impl ExpertiseAgent {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn select_domain(message: &str) -> Option<&'static str> {
        let lower = message.to_lowercase();
        EXPERTISE_DOMAINS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(domain, _)| *domain)
    }
}

#[async_trait]
impl Agent for ExpertiseAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Expertise
    }

    fn system_prompt(&self) -> &str {
        "You are a subject-matter expert. Answer precisely within your domain and flag \
         when a question needs a licensed professional."
    }

    fn can_handle(&self, message: &str, context: &AgentContext) -> f32 {
        let all_keywords: Vec<&str> = EXPERTISE_DOMAINS.iter().flat_map(|(_, k)| k.iter().copied()).collect();
        template::score(message, context, &ConfidenceTemplate::default(), &all_keywords, &[])
    }

    async fn process(
        &self,
        message: &str,
        _context: &AgentContext,
        history: &[Message],
    ) -> Result<AgentResult, AgentError> {
        let domain = Self::select_domain(message).unwrap_or("general");
        let prompt = format!("{} Active domain: {}.", self.system_prompt(), domain);
        let text = respond(self.llm.as_ref(), &prompt, message, history).await?;
        let mut result = AgentResult::new(text, AgentType::Expertise);
        result.metadata.insert("domain".to_string(), MetadataValue::Text(domain.to_string()));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_core::{FinishReason, LlmResponse, SearchResult, SearchResults};
    use nexus_llm::LlmError;
    use nexus_search::SearchError;

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: GenerateOptions,
        ) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                content: "stub answer".to_string(),
                model_id: "stub".to_string(),
                usage: None,
                finish_reason: Some(FinishReason::Stop),
                raw: None,
            })
        }

        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    struct StubSource {
        results: Vec<SearchResult>,
    }

    #[async_trait]
    impl SearchProvider for StubSource {
        async fn search(&self, request: SearchRequest) -> Result<SearchResults, SearchError> {
            Ok(SearchResults {
                results: self.results.clone(),
                query: request.query,
                total: Some(self.results.len() as u32),
                search_id: None,
                created: None,
            })
        }

        fn provider_name(&self) -> &str {
            "stub-source"
        }
    }

    #[tokio::test]
    async fn knowledge_base_agent_scores_higher_with_keyword_hit() {
        let agent = KnowledgeBaseAgent::new(Arc::new(StubLlm), None);
        let ctx = AgentContext::new();
        assert!(agent.can_handle("check our internal wiki", &ctx) > agent.can_handle("hello there", &ctx));
    }

    #[tokio::test]
    async fn fact_check_agent_requires_search_context() {
        let agent = FactCheckAgent::new(Arc::new(StubLlm));
        let ctx = AgentContext::new();
        assert_eq!(agent.can_handle("is it true that the sky is blue", &ctx), 0.0);
    }

    #[tokio::test]
    async fn information_agent_without_a_source_falls_back_to_general_knowledge() {
        let agent = KnowledgeBaseAgent::new(Arc::new(StubLlm), None);
        let result = agent.process("what's in the wiki", &AgentContext::new(), &[]).await.unwrap();
        assert_eq!(result.confidence, 0.5);
        assert!(result.metadata.get(metadata_keys::SOURCES).map_or(false, |v| v.as_list().unwrap().is_empty()));
    }

    #[tokio::test]
    async fn information_agent_with_results_populates_real_metadata() {
        let source = Arc::new(StubSource {
            results: vec![SearchResult {
                title: "Runbook".to_string(),
                content: "Restart the service.".to_string(),
                link: "https://wiki.internal/runbook".to_string(),
                ..Default::default()
            }],
        });
        let agent = KnowledgeBaseAgent::new(Arc::new(StubLlm), Some(source));
        let result = agent.process("how do I restart the service", &AgentContext::new(), &[]).await.unwrap();

        assert_eq!(result.confidence, 0.9);
        let sources = result.metadata.get(metadata_keys::SOURCES).unwrap().as_list().unwrap();
        assert_eq!(sources[0].as_str(), Some("https://wiki.internal/runbook"));
        let search_results = result.metadata.get(metadata_keys::SEARCH_RESULTS).unwrap().as_str().unwrap();
        assert!(search_results.contains("Restart the service."));
    }

    #[tokio::test]
    async fn information_agent_falls_back_when_source_returns_no_results() {
        let source = Arc::new(StubSource { results: Vec::new() });
        let agent = NewsAgent::new(Arc::new(StubLlm), Some(source));
        let result = agent.process("what happened today", &AgentContext::new(), &[]).await.unwrap();
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn expertise_agent_selects_domain_from_keywords() {
        assert_eq!(ExpertiseAgent::select_domain("what is this vulnerability"), Some("security"));
        assert_eq!(ExpertiseAgent::select_domain("what's the weather"), None);
    }

    #[tokio::test]
    async fn expertise_agent_records_selected_domain_in_metadata() {
        let agent = ExpertiseAgent::new(Arc::new(StubLlm));
        let result = agent.process("is this contract compliant with gdpr", &AgentContext::new(), &[]).await.unwrap();
        assert_eq!(result.metadata.get("domain").and_then(|v| v.as_str()), Some("legal"));
    }

    #[tokio::test]
    async fn todoist_agent_succeeds_against_the_null_task_provider() {
        let agent = TodoistAgent::new(Arc::new(StubLlm), Arc::new(NullTaskProvider));
        let result = agent.process("remind me about my todo list", &AgentContext::new(), &[]).await.unwrap();
        assert_eq!(result.response, "stub answer");
    }
}
