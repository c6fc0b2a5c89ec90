//! Errors raised at the search provider boundary.
//!
//! Provider-layer errors the classifier in [`nexus_core::reliability`] operates over —
//! by the time an error reaches the agent it has already been classified and, where
//! applicable, retried and breaker-gated (§4.4/§4.5).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider error: {0}")]
    Provider(String),
    #[error("search provider rate limited: {0}")]
    RateLimit(String),
    #[error("circuit breaker open for search provider")]
    CircuitOpen,
    #[error("invalid search request: {0}")]
    InvalidRequest(String),
    #[error("search provider misconfigured: {0}")]
    Configuration(String),
    #[error("network error calling search provider: {0}")]
    Network(String),
    #[error("could not parse search provider response: {0}")]
    InvalidResponse(String),
}

impl SearchError {
    /// Type name + display string fed to [`nexus_core::reliability::classify_error`].
    pub fn classifier_input(&self) -> (&'static str, String) {
        let type_name = match self {
            SearchError::Provider(_) => "SearchError::Provider",
            SearchError::RateLimit(_) => "SearchError::RateLimit",
            SearchError::CircuitOpen => "SearchError::CircuitOpen",
            SearchError::InvalidRequest(_) => "SearchError::InvalidRequest",
            SearchError::Configuration(_) => "SearchError::Configuration",
            SearchError::Network(_) => "SearchError::Network",
            SearchError::InvalidResponse(_) => "SearchError::InvalidResponse",
        };
        (type_name, self.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Network("request timed out".to_string())
        } else {
            SearchError::Network(err.to_string())
        }
    }
}

impl From<nexus_core::SearchRequestError> for SearchError {
    fn from(err: nexus_core::SearchRequestError) -> Self {
        SearchError::InvalidRequest(err.to_string())
    }
}
