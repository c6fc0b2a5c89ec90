//! Maps `agent_type -> agent` (§4.1). Write-once at startup, read-only at request time
//! (§5): the dispatcher and the plan executor both hold a shared reference, never a
//! mutable one, after construction completes.

use std::collections::HashMap;
use std::sync::Arc;

use nexus_core::AgentType;

use crate::agent::Agent;
use crate::context::AgentContext;

#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<AgentType, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.agent_type(), agent);
    }

    pub fn get(&self, agent_type: AgentType) -> Option<Arc<dyn Agent>> {
        self.agents.get(&agent_type).cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<dyn Agent>> {
        self.agents.values().cloned().collect()
    }

    pub fn contains(&self, agent_type: AgentType) -> bool {
        self.agents.contains_key(&agent_type)
    }

    pub fn registered_types(&self) -> Vec<AgentType> {
        self.agents.keys().copied().collect()
    }

    /// Picks the agent with the highest `can_handle` score, falling back to
    /// `AgentType::Default` when every score is zero or the registry is otherwise
    /// unable to decide.
    pub fn determine_agent(&self, message: &str, context: &AgentContext) -> Option<Arc<dyn Agent>> {
        let mut best: Option<(f32, Arc<dyn Agent>)> = None;
        for agent in self.agents.values() {
            let score = agent.can_handle(message, context);
            if score > 0.0 && best.as_ref().map_or(true, |(b, _)| score > *b) {
                best = Some((score, agent.clone()));
            }
        }
        best.map(|(_, agent)| agent).or_else(|| self.get(AgentType::Default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_core::{AgentResult, Message};

    use crate::error::AgentError;

    struct StubAgent {
        agent_type: AgentType,
        score: f32,
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
            self.score
        }

        async fn process(
            &self,
            _message: &str,
            _context: &AgentContext,
            _history: &[Message],
        ) -> Result<AgentResult, AgentError> {
            Ok(AgentResult::new("stub response", self.agent_type))
        }
    }

    #[test]
    fn determine_agent_picks_the_highest_score() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(StubAgent { agent_type: AgentType::Default, score: 0.1 }));
        registry.register(Arc::new(StubAgent { agent_type: AgentType::WebSearch, score: 0.8 }));

        let picked = registry.determine_agent("q", &AgentContext::new()).unwrap();
        assert_eq!(picked.agent_type(), AgentType::WebSearch);
    }

    #[test]
    fn determine_agent_falls_back_to_default_when_all_scores_are_zero() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(StubAgent { agent_type: AgentType::Default, score: 0.0 }));
        registry.register(Arc::new(StubAgent { agent_type: AgentType::WebSearch, score: 0.0 }));

        let picked = registry.determine_agent("q", &AgentContext::new()).unwrap();
        assert_eq!(picked.agent_type(), AgentType::Default);
    }
}
