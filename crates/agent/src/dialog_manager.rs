//! Turn driver (§4.7): owns per-user `DialogContext` serialization, assembles the
//! per-turn `AgentContext`, and dispatches to either the planner/executor pipeline or a
//! single `determine_agent` call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use nexus_core::{AgentType, DialogContext, Message, MessageRole, Metadata};
use nexus_memory::{MemoryExtractionService, MemoryService};
use tokio::sync::Mutex;

use crate::context::AgentContext;
use crate::dispatcher::Dispatcher;
use crate::executor::PlanExecutor;
use crate::registry::AgentRegistry;

const APOLOGY: &str = "Sorry, I ran into a problem handling that. Please try again.";

/// Outcome of one turn (§4.7 step 8).
pub struct TurnResult {
    pub response: String,
    pub agent_type: AgentType,
    pub confidence: f32,
    pub session_id: String,
    pub processing_time_ms: u64,
    pub metadata: Metadata,
}

pub struct DialogManager {
    registry: Arc<AgentRegistry>,
    dispatcher: Option<Dispatcher>,
    executor: PlanExecutor,
    memory: Option<Arc<MemoryService>>,
    extraction: Option<Arc<MemoryExtractionService>>,
    history_limit: usize,
    max_dialog_contexts: usize,
    contexts: DashMap<i64, Arc<Mutex<DialogContext>>>,
    lru: Mutex<VecDeque<i64>>,
}

impl DialogManager {
    pub fn new(
        registry: Arc<AgentRegistry>,
        dispatcher: Option<Dispatcher>,
        memory: Option<Arc<MemoryService>>,
        extraction: Option<Arc<MemoryExtractionService>>,
        history_limit: usize,
        max_dialog_contexts: usize,
    ) -> Self {
        let executor = PlanExecutor::new(registry.clone());
        Self {
            registry,
            dispatcher,
            executor,
            memory,
            extraction,
            history_limit,
            max_dialog_contexts,
            contexts: DashMap::new(),
            lru: Mutex::new(VecDeque::new()),
        }
    }

    /// Obtain or create the per-user dialog context, LRU-evicting the oldest entry once
    /// `max_dialog_contexts` is exceeded.
    async fn context_for(&self, user_id: i64, session_id: &str) -> Arc<Mutex<DialogContext>> {
        if let Some(existing) = self.contexts.get(&user_id) {
            let mut lru = self.lru.lock().await;
            lru.retain(|id| *id != user_id);
            lru.push_back(user_id);
            return existing.clone();
        }

        let fresh = Arc::new(Mutex::new(DialogContext::new(user_id, session_id, self.history_limit)));
        self.contexts.insert(user_id, fresh.clone());

        let mut lru = self.lru.lock().await;
        lru.push_back(user_id);
        if lru.len() > self.max_dialog_contexts {
            if let Some(evicted) = lru.pop_front() {
                self.contexts.remove(&evicted);
            }
        }
        fresh
    }

    pub async fn handle_turn(&self, user: &nexus_core::User, session_id: &str, message: &str) -> TurnResult {
        let start = Instant::now();
        let dialog_context = self.context_for(user.id, session_id).await;
        let mut dialog_context = dialog_context.lock().await;

        let mut agent_context = AgentContext::new();
        if let Some(memory) = &self.memory {
            if let Err(e) = memory.upsert_user(user).await {
                tracing::warn!(user_id = user.id, error = %e, "failed to upsert user");
            }
            if let Err(e) = memory.get_or_create_session(session_id, user.id).await {
                tracing::warn!(user_id = user.id, error = %e, "failed to get or create session");
            }
            match memory.get_memory_context(user.id, true, self.history_limit).await {
                Ok(snapshot) => agent_context = agent_context.with_memory(snapshot),
                Err(e) => tracing::warn!(user_id = user.id, error = %e, "failed to load memory snapshot"),
            }
            if let Err(e) = memory
                .add_message(user.id, session_id, MessageRole::User, message, None, None, None)
                .await
            {
                tracing::warn!(user_id = user.id, error = %e, "failed to store incoming message");
            }
        }

        dialog_context.push(Message::user(message));
        let history: Vec<Message> = dialog_context.history().iter().cloned().collect();

        let (response, agent_type, confidence, metadata) = if let Some(dispatcher) = &self.dispatcher {
            let plan = dispatcher.create_plan(message, &self.registry).await;
            let outcome = self.executor.execute(&plan, message, agent_context, &history).await;
            (outcome.final_response, outcome.agent_type, outcome.confidence, Metadata::new())
        } else {
            match self.registry.determine_agent(message, &agent_context) {
                Some(agent) => match agent.process(message, &agent_context, &history).await {
                    Ok(result) => (result.response, result.agent_type, result.confidence, result.metadata),
                    Err(e) => {
                        tracing::warn!(user_id = user.id, error = %e, "agent processing failed");
                        (APOLOGY.to_string(), AgentType::Default, 0.0, Metadata::new())
                    }
                },
                None => (APOLOGY.to_string(), AgentType::Default, 0.0, Metadata::new()),
            }
        };

        dialog_context.current_agent = Some(agent_type);
        dialog_context.push(Message::assistant(response.clone()));

        let processing_time_ms = start.elapsed().as_millis() as u64;

        if let Some(memory) = &self.memory {
            if let Err(e) = memory
                .add_message(
                    user.id,
                    session_id,
                    MessageRole::Assistant,
                    &response,
                    Some(agent_type),
                    None,
                    Some(processing_time_ms as u32),
                )
                .await
            {
                tracing::warn!(user_id = user.id, error = %e, "failed to store assistant message");
            }

            if let Some(extraction) = &self.extraction {
                let extraction = extraction.clone();
                let user_id = user.id;
                let session_id = session_id.to_string();
                let message = message.to_string();
                let history = history.clone();
                tokio::spawn(async move {
                    extraction.extract_and_store(user_id, &session_id, &message, &history).await;
                });
            }
        }

        TurnResult {
            response,
            agent_type,
            confidence,
            session_id: session_id.to_string(),
            processing_time_ms,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_core::AgentResult;

    use crate::agent::Agent;
    use crate::error::AgentError;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn agent_type(&self) -> AgentType {
            AgentType::Default
        }

        fn system_prompt(&self) -> &str {
            "echo"
        }

        fn can_handle(&self, _message: &str, _context: &AgentContext) -> f32 {
            0.1
        }

        async fn process(
            &self,
            message: &str,
            _context: &AgentContext,
            _history: &[Message],
        ) -> Result<AgentResult, AgentError> {
            Ok(AgentResult::new(format!("echo: {message}"), AgentType::Default))
        }
    }

    #[tokio::test]
    async fn turn_without_memory_or_dispatcher_uses_registry_fallback() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(EchoAgent));
        let registry = Arc::new(registry);

        let manager = DialogManager::new(registry, None, None, None, 20, 100);
        let user = nexus_core::User::ephemeral(1);
        let result = manager.handle_turn(&user, "session-1", "hi there").await;

        assert_eq!(result.response, "echo: hi there");
        assert_eq!(result.agent_type, AgentType::Default);
    }

    #[tokio::test]
    async fn dialog_contexts_evict_lru_past_cap() {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(EchoAgent));
        let registry = Arc::new(registry);

        let manager = DialogManager::new(registry, None, None, None, 20, 1);
        let user1 = nexus_core::User::ephemeral(1);
        let user2 = nexus_core::User::ephemeral(2);

        manager.handle_turn(&user1, "s1", "hi").await;
        manager.handle_turn(&user2, "s2", "hi").await;

        assert!(!manager.contexts.contains_key(&1));
        assert!(manager.contexts.contains_key(&2));
    }
}
