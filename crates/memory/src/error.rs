//! Errors raised at the persistence boundary (§7: "Memory — any persistence failure:
//! logged, does not affect the reply").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("extraction LLM call failed: {0}")]
    Llm(#[from] nexus_llm::LlmError),
}

impl From<scylla::transport::errors::QueryError> for MemoryError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        MemoryError::Backend(err.to_string())
    }
}

impl From<scylla::transport::errors::NewSessionError> for MemoryError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        MemoryError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}
