//! Execution plan: the artifact the dispatcher produces and the plan executor consumes.

use crate::agent_type::AgentType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a step's input text should be selected when it is not driven by `depends_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputTransform {
    /// Use the original user message verbatim.
    Original,
    /// Use the most recently completed step's response.
    Previous,
    /// Custom instruction text a future agent implementation may interpret.
    Custom(String),
}

/// A single step in an [`ExecutionPlan`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub agent_type: AgentType,
    pub description: String,
    pub input_transform: Option<InputTransform>,
    pub is_optional: bool,
    /// Index of the step this step depends on. `None` means it runs in level 0.
    pub depends_on: Option<usize>,
}

impl PlanStep {
    pub fn new(agent_type: AgentType, description: impl Into<String>) -> Self {
        Self {
            agent_type,
            description: description.into(),
            input_transform: None,
            is_optional: false,
            depends_on: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn depends_on(mut self, index: usize) -> Self {
        self.depends_on = Some(index);
        self
    }
}

/// A plan for executing one or more agents to satisfy a single user turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
    pub reasoning: String,
    /// Agent types the planner would have liked to use but that are not registered.
    pub missing_agents: Vec<AgentType>,
    pub missing_agents_reason: HashMap<String, String>,
}

impl ExecutionPlan {
    /// A single-step plan routing straight to `default`. Used as the fallback plan
    /// whenever the dispatcher's LLM call or JSON parse fails.
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            steps: vec![PlanStep::new(AgentType::Default, "handle message")],
            reasoning: reasoning.into(),
            missing_agents: Vec::new(),
            missing_agents_reason: HashMap::new(),
        }
    }

    pub fn agent_types(&self) -> Vec<AgentType> {
        self.steps.iter().map(|s| s.agent_type).collect()
    }

    pub fn has_missing_agents(&self) -> bool {
        !self.missing_agents.is_empty()
    }

    /// Invariant check: every `depends_on` must reference a strictly lower index.
    pub fn has_valid_dependencies(&self) -> bool {
        self.steps
            .iter()
            .enumerate()
            .all(|(i, step)| step.depends_on.map_or(true, |dep| dep < i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_plan_is_single_default_step() {
        let plan = ExecutionPlan::fallback("llm unavailable");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].agent_type, AgentType::Default);
        assert!(!plan.has_missing_agents());
    }

    #[test]
    fn valid_dependencies_reference_lower_indices() {
        let plan = ExecutionPlan {
            steps: vec![
                PlanStep::new(AgentType::WebSearch, "search"),
                PlanStep::new(AgentType::Default, "answer").depends_on(0),
            ],
            reasoning: String::new(),
            missing_agents: vec![],
            missing_agents_reason: HashMap::new(),
        };
        assert!(plan.has_valid_dependencies());
    }

    #[test]
    fn forward_dependency_is_invalid() {
        let plan = ExecutionPlan {
            steps: vec![PlanStep::new(AgentType::Default, "answer").depends_on(0)],
            reasoning: String::new(),
            missing_agents: vec![],
            missing_agents_reason: HashMap::new(),
        };
        assert!(!plan.has_valid_dependencies());
    }
}
