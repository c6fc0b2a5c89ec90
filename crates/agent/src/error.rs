//! Top-level error type for the orchestration engine (§7). By the time an error
//! reaches here it has already been classified and, where applicable, retried at the
//! provider layer (`LlmError`/`SearchError`).

use nexus_llm::LlmError;
use nexus_memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("agent registry error: {0}")]
    Registry(String),
    #[error("planning failed: {0}")]
    PlanningFailed(String),
    #[error("operation timed out")]
    Timeout,
}
