//! The planner (§4.2): asks the LLM for an ordered plan over the currently registered
//! agents, then parses and sanitizes the result.

use std::collections::HashMap;
use std::sync::Arc;

use nexus_core::{AgentType, ExecutionPlan, InputTransform, Message, PlanStep};
use nexus_llm::{GenerateOptions, LlmProvider};
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::registry::AgentRegistry;

/// Alias -> canonical wire name (§4.2). Built once; the dispatcher resolves plan-step
/// agent names and the `missing_agents`/`missing_agents_reason` lists through this same
/// table so both use identical alias resolution.
static AGENT_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("default", "default"),
        ("dispatcher", "dispatcher"),
        ("web_search", "web_search"),
        ("websearch", "web_search"),
        ("search", "web_search"),
        ("knowledge_base", "knowledge_base"),
        ("kb", "knowledge_base"),
        ("tech_docs", "tech_docs"),
        ("techdocs", "tech_docs"),
        ("documentation", "tech_docs"),
        ("code_analysis", "code_analysis"),
        ("code", "code_analysis"),
        ("codeanalysis", "code_analysis"),
        ("metrics", "metrics"),
        ("stats", "metrics"),
        ("statistics", "metrics"),
        ("news", "news"),
        ("todoist", "todoist"),
        ("todo", "todoist"),
        ("task", "task"),
        ("analysis", "analysis"),
        ("analyze", "analysis"),
        ("fact_check", "fact_check"),
        ("factcheck", "fact_check"),
        ("fact-check", "fact_check"),
        ("comparison", "comparison"),
        ("compare", "comparison"),
        ("summary", "summary"),
        ("summarize", "summary"),
        ("tldr", "summary"),
        ("clarification", "clarification"),
        ("clarify", "clarification"),
        ("expertise", "expertise"),
        ("expert", "expertise"),
        ("security", "expertise"),
        ("legal", "expertise"),
        ("small_talk", "small_talk"),
        ("smalltalk", "small_talk"),
    ])
});

const DISPATCHER_SYSTEM_PROMPT_PREAMBLE: &str = "You are a planner for a conversational \
assistant. Given the user's message, produce a JSON plan describing which agents should \
handle it and in what order. Respond with only the JSON object, nothing else. Shape:\n\
{\"steps\": [{\"agent\": \"<agent_type>\", \"description\": \"...\", \"is_optional\": false}], \
\"reasoning\": \"...\", \"missing_agents\": [\"...\"], \"missing_agents_reason\": {\"...\": \"...\"}}\n\n\
Available agents:";

fn one_line_description(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::WebSearch => "Searches the web for current information.",
        AgentType::KnowledgeBase => "Answers from the internal knowledge base.",
        AgentType::TechDocs => "Answers questions about technical documentation and APIs.",
        AgentType::CodeAnalysis => "Reads and explains source code.",
        AgentType::Metrics => "Answers questions about system metrics and dashboards.",
        AgentType::News => "Summarizes recent news and current events.",
        AgentType::Todoist => "Manages the user's tasks and to-do items.",
        AgentType::Analysis => "Analyzes previously gathered information.",
        AgentType::FactCheck => "Checks claims against previously gathered sources.",
        AgentType::Comparison => "Compares items from previously gathered information.",
        AgentType::Summary => "Summarizes previously gathered information.",
        AgentType::Clarification => "Asks a clarifying question when the request is ambiguous.",
        AgentType::Expertise => "Domain-expert answers (security, legal, finance, ...).",
        AgentType::Default => "General-purpose conversational responder.",
        _ => "",
    }
}

/// Resolve a planner-supplied agent name, case-insensitively, through the alias table
/// (§4.2). Unknown names collapse to `None` rather than `Default` here so the caller can
/// distinguish "explicitly asked for default" from "couldn't resolve".
fn resolve_agent_name(name: &str) -> Option<AgentType> {
    let lower = name.trim().to_lowercase();
    let canonical = *AGENT_ALIASES.get(lower.as_str())?;
    AgentType::ALL.iter().copied().find(|t| t.as_str() == canonical)
}

#[derive(Debug, Deserialize)]
struct RawStep {
    agent: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_optional: bool,
    #[serde(default)]
    depends_on: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    steps: Vec<RawStep>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    missing_agents: Vec<String>,
    #[serde(default)]
    missing_agents_reason: HashMap<String, String>,
}

pub struct Dispatcher {
    llm: Arc<dyn LlmProvider>,
}

impl Dispatcher {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn build_system_prompt(&self, registry: &AgentRegistry) -> String {
        let mut prompt = DISPATCHER_SYSTEM_PROMPT_PREAMBLE.to_string();
        for agent_type in registry.registered_types() {
            if agent_type == AgentType::Dispatcher {
                continue;
            }
            let description = one_line_description(agent_type);
            prompt.push_str(&format!("\n- {}: {}", agent_type.as_str(), description));
        }
        prompt
    }

    pub async fn create_plan(&self, message: &str, registry: &AgentRegistry) -> ExecutionPlan {
        let system_prompt = self.build_system_prompt(registry);
        let messages = [Message::system(system_prompt), Message::user(message)];

        let response = match self.llm.generate(&messages, GenerateOptions::default()).await {
            Ok(r) => r.content,
            Err(e) => {
                tracing::warn!(error = %e, "dispatcher llm call failed, falling back to default plan");
                return ExecutionPlan::fallback(format!("planner unavailable: {}", e));
            }
        };

        match parse_plan(&response, registry) {
            Some(plan) => plan,
            None => {
                tracing::debug!(response, "could not parse dispatcher plan, falling back to default plan");
                ExecutionPlan::fallback("could not parse planner output")
            }
        }
    }
}

fn parse_plan(text: &str, registry: &AgentRegistry) -> Option<ExecutionPlan> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let raw: RawPlan = serde_json::from_str(&text[start..=end]).ok()?;
    if raw.steps.is_empty() {
        return None;
    }

    let steps = raw
        .steps
        .into_iter()
        .map(|s| {
            let agent_type = resolve_agent_name(&s.agent).unwrap_or(AgentType::Default);
            let mut step = PlanStep::new(agent_type, s.description);
            if s.is_optional {
                step = step.optional();
            }
            if let Some(dep) = s.depends_on {
                step = step.depends_on(dep);
            } else {
                step.input_transform = Some(InputTransform::Original);
            }
            step
        })
        .collect::<Vec<_>>();

    let missing_agents: Vec<AgentType> = raw
        .missing_agents
        .iter()
        .filter_map(|name| resolve_agent_name(name))
        .filter(|agent_type| !registry.contains(*agent_type))
        .collect();

    let missing_agents_reason: HashMap<String, String> = raw
        .missing_agents_reason
        .into_iter()
        .filter(|(name, _)| {
            resolve_agent_name(name).map_or(true, |agent_type| !registry.contains(agent_type))
        })
        .collect();

    Some(ExecutionPlan { steps, reasoning: raw.reasoning, missing_agents, missing_agents_reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_core::AgentResult;

    use crate::agent::Agent;
    use crate::context::AgentContext;
    use crate::error::AgentError;

    struct StubAgent {
        agent_type: AgentType,
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn agent_type(&self) -> AgentType {
            self.agent_type
        }

        fn system_prompt(&self) -> &str {
            "stub"
        }

        fn can_handle(&self, _message: &str, _context: &AgentContext) -> f32 {
            0.5
        }

        async fn process(
            &self,
            _message: &str,
            _context: &AgentContext,
            _history: &[Message],
        ) -> Result<AgentResult, AgentError> {
            Ok(AgentResult::new("stub", self.agent_type))
        }
    }

    #[test]
    fn resolves_common_aliases_case_insensitively() {
        assert_eq!(resolve_agent_name("WebSearch"), Some(AgentType::WebSearch));
        assert_eq!(resolve_agent_name("kb"), Some(AgentType::KnowledgeBase));
        assert_eq!(resolve_agent_name("tldr"), Some(AgentType::Summary));
        assert_eq!(resolve_agent_name("factcheck"), Some(AgentType::FactCheck));
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        assert_eq!(resolve_agent_name("astrology"), None);
    }

    #[test]
    fn task_alias_resolves_to_legacy_type_not_todoist() {
        assert_eq!(resolve_agent_name("task"), Some(AgentType::Task));
        assert_ne!(resolve_agent_name("task"), Some(AgentType::Todoist));
    }

    #[test]
    fn parse_plan_recovers_json_surrounded_by_prose() {
        let text = "Sure, here's my plan:\n{\"steps\": [{\"agent\": \"websearch\", \"description\": \"look it up\"}], \"reasoning\": \"needs fresh data\"}\nLet me know if that works.";
        let registry = AgentRegistry::new();
        let plan = parse_plan(text, &registry).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].agent_type, AgentType::WebSearch);
    }

    #[test]
    fn unparseable_plan_text_returns_none() {
        let registry = AgentRegistry::new();
        assert!(parse_plan("not json at all", &registry).is_none());
    }

    #[test]
    fn missing_agents_already_registered_are_filtered_out() {
        let text = "{\"steps\": [{\"agent\": \"default\", \"description\": \"reply\"}], \
                     \"reasoning\": \"ok\", \"missing_agents\": [\"websearch\"], \
                     \"missing_agents_reason\": {\"websearch\": \"would help\"}}";
        let mut registry = AgentRegistry::new();
        registry.register(std::sync::Arc::new(StubAgent { agent_type: AgentType::WebSearch }));
        let plan = parse_plan(text, &registry).unwrap();
        assert!(!plan.has_missing_agents());
        assert!(plan.missing_agents_reason.is_empty());
    }
}
