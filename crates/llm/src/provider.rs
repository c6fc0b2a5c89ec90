//! The LLM provider contract (§6): `generate` is required, `generate_stream` is
//! optional and defaults to a single non-streamed chunk.

use async_trait::async_trait;
use nexus_core::{LlmResponse, Message};
use tokio::sync::mpsc;

use crate::LlmError;

/// Optional sampling/limit overrides for one `generate` call.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Provider-specific extra parameters, passed through verbatim.
    pub extra: Option<serde_json::Value>,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `messages` in the `{role, content}` shape.
    async fn generate(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> Result<LlmResponse, LlmError>;

    /// Stream a completion token-by-token over `tx`. The default implementation calls
    /// [`LlmProvider::generate`] and forwards the whole response as one chunk — adequate
    /// for providers with no native streaming support.
    async fn generate_stream(
        &self,
        messages: &[Message],
        options: GenerateOptions,
        tx: mpsc::Sender<String>,
    ) -> Result<LlmResponse, LlmError> {
        let response = self.generate(messages, options).await?;
        let _ = tx.send(response.content.clone()).await;
        Ok(response)
    }

    /// Stable identifier used in logs and telemetry.
    fn provider_name(&self) -> &str;
}
