//! Plan executor (§4.3): groups steps into dependency levels, runs each level
//! concurrently, and threads accumulated context between levels in step-index order.

use std::sync::Arc;

use nexus_core::{AgentResult, AgentType, ExecutionPlan, InputTransform, Message, PlanStep};

use crate::agent::Agent;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::registry::AgentRegistry;

const APOLOGY: &str = "Sorry, something went wrong while I was putting together an answer. \
Could you try again?";

/// Per-step outcome, kept alongside the index it belongs to so level results can be
/// folded back into `context` in ascending order after a level's join (§4.3).
enum StepOutcome {
    Completed(AgentResult),
    Skipped,
    Errored,
}

pub struct PlanExecutor {
    registry: Arc<AgentRegistry>,
}

pub struct ExecutionOutcome {
    pub final_response: String,
    pub agent_type: AgentType,
    pub confidence: f32,
    pub succeeded: bool,
}

impl PlanExecutor {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        message: &str,
        mut context: AgentContext,
        history: &[Message],
    ) -> ExecutionOutcome {
        let levels = group_into_levels(&plan.steps);

        let mut outcomes: Vec<Option<StepOutcome>> = (0..plan.steps.len()).map(|_| None).collect();
        let mut plan_errored = false;
        let mut last_completed_index: Option<usize> = None;

        for level in levels {
            if level.len() == 1 {
                let idx = level[0];
                let outcome = self
                    .run_step(idx, &plan.steps[idx], message, &context, history, &outcomes)
                    .await;
                self.fold_in(idx, outcome, &mut outcomes, &mut context, &plan.steps, &mut plan_errored, &mut last_completed_index);
                continue;
            }

            let mut handles = Vec::with_capacity(level.len());
            for &idx in &level {
                let step = plan.steps[idx].clone();
                let input = select_input(idx, &step, &context, &outcomes, message);
                let resolved = self.resolve_step_agent(&step);
                let context_snapshot = context.clone();
                let history = history.to_vec();
                handles.push(tokio::spawn(async move {
                    let outcome = match resolved {
                        Ok((agent, is_fallback)) => match agent.process(&input, &context_snapshot, &history).await {
                            Ok(mut result) => {
                                if is_fallback {
                                    result.metadata.insert(
                                        nexus_core::metadata_keys::FALLBACK.to_string(),
                                        nexus_core::MetadataValue::Flag(true),
                                    );
                                }
                                StepOutcome::Completed(result)
                            }
                            Err(e) => {
                                tracing::warn!(agent = %step.agent_type, error = %e, "agent step failed");
                                StepOutcome::Errored
                            }
                        },
                        Err(outcome) => outcome,
                    };
                    (idx, outcome)
                }));
            }

            let mut joined: Vec<(usize, StepOutcome)> = futures::future::join_all(handles)
                .await
                .into_iter()
                .filter_map(|joined| match joined {
                    Ok(pair) => Some(pair),
                    Err(e) => {
                        tracing::error!(error = %e, "agent task panicked");
                        None
                    }
                })
                .collect();
            joined.sort_by_key(|(idx, _)| *idx);

            // A required step failing mid-level discards the whole level's completions
            // from the accumulated context rather than merging a partial, order-dependent
            // view: either every sibling's output is visible to later steps, or none is.
            let level_has_required_failure = joined.iter().any(|(idx, outcome)| {
                matches!(outcome, StepOutcome::Errored) && !plan.steps[*idx].is_optional
            });

            if level_has_required_failure {
                plan_errored = true;
                for (idx, outcome) in joined {
                    outcomes[idx] = Some(outcome);
                }
            } else {
                for (idx, outcome) in joined {
                    let step_is_optional = plan.steps[idx].is_optional;
                    self.apply_outcome(idx, outcome, step_is_optional, &mut outcomes, &mut context, &mut plan_errored, &mut last_completed_index);
                }
            }
        }

        match last_completed_index {
            Some(idx) => {
                let response = match &outcomes[idx] {
                    Some(StepOutcome::Completed(result)) => result.response.clone(),
                    _ => APOLOGY.to_string(),
                };
                let (agent_type, confidence) = match &outcomes[idx] {
                    Some(StepOutcome::Completed(result)) => (result.agent_type, result.confidence),
                    _ => (AgentType::Default, 0.0),
                };
                ExecutionOutcome { final_response: response, agent_type, confidence, succeeded: !plan_errored }
            }
            None => ExecutionOutcome {
                final_response: APOLOGY.to_string(),
                agent_type: AgentType::Default,
                confidence: 0.0,
                succeeded: false,
            },
        }
    }

    /// Resolve a step's agent against the registry, applying the required/optional
    /// substitution policy shared by both singleton and parallel-level execution:
    /// present → use it; absent + optional → `Skipped`; absent + required → `default`
    /// (flagged); absent + required + `default` also absent → `Errored`.
    fn resolve_step_agent(&self, step: &PlanStep) -> Result<(Arc<dyn Agent>, bool), StepOutcome> {
        match self.registry.get(step.agent_type) {
            Some(agent) => Ok((agent, false)),
            None if step.is_optional => Err(StepOutcome::Skipped),
            None => match self.registry.get(AgentType::Default) {
                Some(default_agent) => Ok((default_agent, true)),
                None => Err(StepOutcome::Errored),
            },
        }
    }

    async fn run_step(
        &self,
        idx: usize,
        step: &PlanStep,
        message: &str,
        context: &AgentContext,
        history: &[Message],
        outcomes: &[Option<StepOutcome>],
    ) -> StepOutcome {
        let input = select_input(idx, step, context, outcomes, message);

        let (agent, is_fallback) = match self.resolve_step_agent(step) {
            Ok(pair) => pair,
            Err(outcome) => return outcome,
        };

        match agent.process(&input, context, history).await {
            Ok(mut result) => {
                if is_fallback {
                    result
                        .metadata
                        .insert(nexus_core::metadata_keys::FALLBACK.to_string(), nexus_core::MetadataValue::Flag(true));
                }
                StepOutcome::Completed(result)
            }
            Err(e) => {
                tracing::warn!(agent = %step.agent_type, error = %e, "agent step failed");
                StepOutcome::Errored
            }
        }
    }

    fn fold_in(
        &self,
        idx: usize,
        outcome: StepOutcome,
        outcomes: &mut [Option<StepOutcome>],
        context: &mut AgentContext,
        steps: &[PlanStep],
        plan_errored: &mut bool,
        last_completed_index: &mut Option<usize>,
    ) {
        self.apply_outcome(idx, outcome, steps[idx].is_optional, outcomes, context, plan_errored, last_completed_index);
    }

    fn apply_outcome(
        &self,
        idx: usize,
        outcome: StepOutcome,
        is_optional: bool,
        outcomes: &mut [Option<StepOutcome>],
        context: &mut AgentContext,
        plan_errored: &mut bool,
        last_completed_index: &mut Option<usize>,
    ) {
        match &outcome {
            StepOutcome::Completed(result) => {
                context.apply_step_result(result.agent_type, result);
                *last_completed_index = Some(idx);
            }
            StepOutcome::Errored if !is_optional => {
                *plan_errored = true;
            }
            _ => {}
        }
        outcomes[idx] = Some(outcome);
    }
}

fn select_input(
    idx: usize,
    step: &PlanStep,
    context: &AgentContext,
    outcomes: &[Option<StepOutcome>],
    message: &str,
) -> String {
    if let Some(dep) = step.depends_on {
        if let Some(StepOutcome::Completed(result)) = outcomes.get(dep).and_then(|o| o.as_ref()) {
            return result.response.clone();
        }
    }
    if step.input_transform == Some(InputTransform::Previous) {
        if let Some(previous) = &context.previous_step_output {
            return previous.clone();
        }
    }
    let _ = idx;
    message.to_string()
}

/// Group steps into dependency levels: level 0 holds every `depends_on = None` step,
/// level N+1 holds steps whose dependency already landed in a prior level. Steps whose
/// dependency never resolves (broken reference or cycle) get a singleton level each, in
/// declaration order, so the plan still terminates (§4.3).
fn group_into_levels(steps: &[PlanStep]) -> Vec<Vec<usize>> {
    let mut level_of: Vec<Option<usize>> = vec![None; steps.len()];
    let mut changed = true;

    while changed {
        changed = false;
        for (idx, step) in steps.iter().enumerate() {
            if level_of[idx].is_some() {
                continue;
            }
            match step.depends_on {
                None => {
                    level_of[idx] = Some(0);
                    changed = true;
                }
                Some(dep) => {
                    if let Some(dep_level) = level_of.get(dep).copied().flatten() {
                        level_of[idx] = Some(dep_level + 1);
                        changed = true;
                    }
                }
            }
        }
    }

    let mut next_residual_level = level_of.iter().flatten().max().map_or(0, |m| m + 1);
    for (idx, level) in level_of.iter_mut().enumerate() {
        if level.is_none() {
            *level = Some(next_residual_level);
            next_residual_level += 1;
            let _ = idx;
        }
    }

    let max_level = level_of.iter().flatten().max().copied().unwrap_or(0);
    let mut levels: Vec<Vec<usize>> = (0..=max_level).map(|_| Vec::new()).collect();
    for (idx, level) in level_of.into_iter().enumerate() {
        levels[level.unwrap()].push(idx);
    }
    levels.retain(|l| !l.is_empty());
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_core::Message;

    struct StubAgent {
        agent_type: AgentType,
        fails: bool,
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
            if self.fails {
                Err(AgentError::Registry("stub failure".into()))
            } else {
                Ok(AgentResult::new("sibling output", self.agent_type))
            }
        }
    }

    #[tokio::test]
    async fn required_step_failure_discards_sibling_outputs_from_the_same_level() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(StubAgent { agent_type: AgentType::WebSearch, fails: false }));
        registry.register(Arc::new(StubAgent { agent_type: AgentType::KnowledgeBase, fails: true }));

        let steps = vec![
            PlanStep::new(AgentType::WebSearch, "a"),
            PlanStep::new(AgentType::KnowledgeBase, "b"),
        ];
        let plan = ExecutionPlan { steps, reasoning: String::new(), missing_agents: vec![], missing_agents_reason: Default::default() };

        let executor = PlanExecutor::new(Arc::new(registry));
        let outcome = executor.execute(&plan, "q", AgentContext::new(), &[]).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.final_response, APOLOGY);
    }

    #[tokio::test]
    async fn absent_required_agent_in_a_parallel_level_falls_back_to_default() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(StubAgent { agent_type: AgentType::Default, fails: false }));
        registry.register(Arc::new(StubAgent { agent_type: AgentType::Summary, fails: false }));

        // web_search is not registered; this step is required and lands in level 0
        // alongside summary, so the level has two members and runs through the
        // parallel path rather than the singleton one.
        let steps = vec![PlanStep::new(AgentType::WebSearch, "a"), PlanStep::new(AgentType::Summary, "b")];
        let plan = ExecutionPlan { steps, reasoning: String::new(), missing_agents: vec![], missing_agents_reason: Default::default() };

        let executor = PlanExecutor::new(Arc::new(registry));
        let outcome = executor.execute(&plan, "q", AgentContext::new(), &[]).await;

        assert!(outcome.succeeded);
    }

    #[test]
    fn independent_steps_land_in_level_zero() {
        let steps = vec![PlanStep::new(AgentType::WebSearch, "a"), PlanStep::new(AgentType::Default, "b")];
        let levels = group_into_levels(&steps);
        assert_eq!(levels, vec![vec![0, 1]]);
    }

    #[test]
    fn dependent_step_lands_one_level_after_its_dependency() {
        let steps = vec![
            PlanStep::new(AgentType::WebSearch, "a"),
            PlanStep::new(AgentType::Summary, "b").depends_on(0),
        ];
        let levels = group_into_levels(&steps);
        assert_eq!(levels, vec![vec![0], vec![1]]);
    }

    #[test]
    fn broken_dependency_still_terminates_in_a_singleton_level() {
        let steps = vec![PlanStep::new(AgentType::Summary, "b").depends_on(5)];
        let levels = group_into_levels(&steps);
        assert_eq!(levels, vec![vec![0]]);
    }
}
