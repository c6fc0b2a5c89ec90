//! Output of a single agent's `process` call.

use crate::agent_type::AgentType;
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub response: String,
    pub agent_type: AgentType,
    pub confidence: f32,
    pub metadata: Metadata,
    pub tokens_used: Option<u32>,
    pub should_handoff: bool,
    pub handoff_agent: Option<AgentType>,
}

impl AgentResult {
    pub fn new(response: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            response: response.into(),
            agent_type,
            confidence: 1.0,
            metadata: Metadata::new(),
            tokens_used: None,
            should_handoff: false,
            handoff_agent: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_tokens_used(mut self, tokens: u32) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    pub fn handing_off_to(mut self, agent_type: AgentType) -> Self {
        self.should_handoff = true;
        self.handoff_agent = Some(agent_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped() {
        let r = AgentResult::new("ok", AgentType::Default).with_confidence(1.5);
        assert_eq!(r.confidence, 1.0);
        let r = AgentResult::new("ok", AgentType::Default).with_confidence(-0.2);
        assert_eq!(r.confidence, 0.0);
    }
}
