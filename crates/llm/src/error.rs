//! Errors raised at the LLM provider boundary.
//!
//! These are the *provider-layer* errors the classifier in [`nexus_core::reliability`]
//! operates over — by the time an error reaches `AgentError` it has already been
//! classified and, where applicable, retried (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("network error calling LLM provider: {0}")]
    Network(String),
    #[error("LLM request timed out")]
    Timeout,
    #[error("could not parse LLM response: {0}")]
    InvalidResponse(String),
    #[error("context too long: {0} tokens exceeds provider limit")]
    ContextTooLong(usize),
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("LLM provider misconfigured: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Type name + display string fed to [`nexus_core::reliability::classify_error`].
    pub fn classifier_input(&self) -> (&'static str, String) {
        let type_name = match self {
            LlmError::Api(_) => "LlmError::Api",
            LlmError::Network(_) => "LlmError::Network",
            LlmError::Timeout => "LlmError::Timeout",
            LlmError::InvalidResponse(_) => "LlmError::InvalidResponse",
            LlmError::ContextTooLong(_) => "LlmError::ContextTooLong",
            LlmError::ModelNotFound(_) => "LlmError::ModelNotFound",
            LlmError::Configuration(_) => "LlmError::Configuration",
        };
        (type_name, self.to_string())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
