//! Accumulated context threaded by the plan executor between dependency levels (§4.3).
//!
//! Mutated only at level boundaries — a level's parallel steps each see a snapshot of
//! context as it stood at the start of that level (§4.3 concurrency discipline).

use nexus_core::{AgentResult, AgentType, Metadata, MetadataValue, UserMemoryContext, UserProfile};

/// Per-turn state available to every agent's `process` call.
///
/// `memory`/`user_profile`/`profile_summary` are set once at the start of the turn and
/// never overwritten; `previous_*` fields and the well-known metadata keys
/// (`search_results`, `search_queries`, `sources`) are overwritten by each completed
/// step.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub memory: Option<UserMemoryContext>,
    pub user_profile: Option<UserProfile>,
    pub profile_summary: Option<String>,
    pub previous_step_output: Option<String>,
    pub previous_agent: Option<AgentType>,
    pub previous_step_metadata: Metadata,
    pub accumulated: Metadata,
}

impl AgentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, memory: UserMemoryContext) -> Self {
        self.profile_summary = Some(memory.profile_summary());
        self.user_profile = memory.profile.clone();
        self.memory = Some(memory);
        self
    }

    /// `true` if any of `keys` is present in the accumulated metadata — used by the
    /// context-gated specialized-agent template variant (§4.1).
    pub fn has_any_key(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.accumulated.contains_key(*k))
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.accumulated.get(key)
    }

    /// Apply one completed step's result to the accumulated context: overwrite
    /// `previous_step_output`/`previous_agent`/`previous_step_metadata`, and copy the
    /// well-known information-gathering keys out of its metadata when present.
    pub fn apply_step_result(&mut self, agent_type: AgentType, result: &AgentResult) {
        self.previous_step_output = Some(result.response.clone());
        self.previous_agent = Some(agent_type);
        self.previous_step_metadata = result.metadata.clone();

        for key in [
            nexus_core::metadata_keys::SEARCH_RESULTS,
            nexus_core::metadata_keys::SEARCH_QUERIES,
            nexus_core::metadata_keys::SOURCES,
        ] {
            if let Some(value) = result.metadata.get(key) {
                self.accumulated.insert(key.to_string(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_a_step_result_overwrites_previous_fields() {
        let mut ctx = AgentContext::new();
        let mut result = AgentResult::new("found it", AgentType::WebSearch);
        result
            .metadata
            .insert(nexus_core::metadata_keys::SOURCES.to_string(), MetadataValue::Text("x.com".into()));

        ctx.apply_step_result(AgentType::WebSearch, &result);

        assert_eq!(ctx.previous_step_output.as_deref(), Some("found it"));
        assert_eq!(ctx.previous_agent, Some(AgentType::WebSearch));
        assert!(ctx.has_any_key(&[nexus_core::metadata_keys::SOURCES]));
    }

    #[test]
    fn absent_keys_are_not_flagged() {
        let ctx = AgentContext::new();
        assert!(!ctx.has_any_key(&[nexus_core::metadata_keys::SEARCH_RESULTS]));
    }
}
