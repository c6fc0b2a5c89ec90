//! LLM provider interface (§6): `generate`/`generate_stream` given messages, plus an
//! HTTP-backed reference implementation and the error taxonomy the reliability
//! primitives in `nexus_core` classify.

pub mod error;
pub mod http_provider;
pub mod provider;

pub use error::LlmError;
pub use http_provider::HttpLlmProvider;
pub use provider::{GenerateOptions, LlmProvider};
