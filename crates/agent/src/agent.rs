//! The agent contract (§4.1): a stable type tag, a system prompt, a cheap confidence
//! function, and the fallible processing call itself.

use async_trait::async_trait;
use nexus_core::{AgentResult, AgentType, Message};

use crate::context::AgentContext;
use crate::error::AgentError;

#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    fn system_prompt(&self) -> &str;

    /// Side-effect-free and cheap: called on every registered agent during fallback
    /// routing, so it must not perform I/O.
    fn can_handle(&self, message: &str, context: &AgentContext) -> f32;

    async fn process(
        &self,
        message: &str,
        context: &AgentContext,
        history: &[Message],
    ) -> Result<AgentResult, AgentError>;
}
