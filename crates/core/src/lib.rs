//! Shared data model, error taxonomy, and reliability primitives for the assistant
//! backend.
//!
//! This crate provides the types and operators every other crate builds on:
//! - Message, plan, and agent-result value types exchanged between agents
//! - The user/profile/fact/conversation persistence model
//! - Error classification and the circuit breaker / retry operator
//! - The style catalog used to render agent output

pub mod agent_result;
pub mod agent_type;
pub mod conversation_log;
pub mod dialog_context;
pub mod extraction_event;
pub mod fact;
pub mod llm_response;
pub mod memory_context;
pub mod message;
pub mod metadata;
pub mod plan;
pub mod profile;
pub mod reliability;
pub mod search;
pub mod style;
pub mod user;

pub use agent_result::AgentResult;
pub use agent_type::{AgentCategory, AgentType};
pub use conversation_log::{ConversationMessage, ConversationSession};
pub use dialog_context::DialogContext;
pub use extraction_event::{ExtractedFact, MemoryExtractionEvent};
pub use fact::ProfileFact;
pub use llm_response::{FinishReason, LlmResponse, Usage};
pub use memory_context::UserMemoryContext;
pub use message::{Message, MessageRole};
pub use metadata::{keys as metadata_keys, Metadata, MetadataValue};
pub use plan::{ExecutionPlan, InputTransform, PlanStep};
pub use profile::{ProfileUpdates, UserProfile};
pub use reliability::{
    classify_error, retry_with_backoff, AlertSeverity, CircuitBreaker, CircuitState,
    ClassifiedError, ErrorCategory, RetryConfig, RetryOutcome, RetryStats, RetryableError,
};
pub use search::{SearchRecency, SearchRequest, SearchRequestError, SearchResult, SearchResults};
pub use style::{render_and_chunk, system_prompt_for, StyleType};
pub use user::User;
