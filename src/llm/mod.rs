//! Text-generation backends.
//!
//! The analyzer only needs "prompt in, text out", so every provider sits behind [`LlmClient`].
//! The production client speaks the OpenAI chat-completions protocol, which also covers
//! compatible gateways selected through `OPENAI_BASE_URL`. [`get_llm_client`] wraps it in a
//! [`ThrottledClient`] so the whole process respects the configured concurrency and
//! requests-per-minute ceilings.

mod openai;
mod throttle;

pub use openai::OpenAiClient;
pub use throttle::ThrottledClient;

use crate::config::Config;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by text-generation backends.
#[derive(Debug, Error)]
pub enum LlmClientError {
    /// The client could not be constructed from the supplied settings.
    #[error("Invalid LLM client configuration: {0}")]
    Configuration(String),
    /// Provider could not be reached.
    #[error("LLM provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider answered with an error status (auth, quota, bad request, ...).
    #[error("LLM generation failed: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded or carried no text.
    #[error("Malformed LLM response: {0}")]
    InvalidResponse(String),
    /// Provider did not answer within the configured bound.
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),
}

/// A single prompt sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Role framing sent as the system message.
    pub system_prompt: String,
    /// Task body sent as the user message.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Interface implemented by text-generation providers.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the request and return the raw text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmClientError>;
}

#[async_trait]
impl<T> LlmClient for Arc<T>
where
    T: LlmClient + ?Sized,
{
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmClientError> {
        (**self).complete(request).await
    }
}

/// Build the throttled OpenAI-compatible client described by the configuration.
pub fn get_llm_client(config: &Config) -> Result<Arc<dyn LlmClient>, LlmClientError> {
    let client = OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    tracing::info!(
        base_url = %config.openai_base_url,
        model = %config.openai_model_name,
        max_concurrency = config.llm_max_concurrency,
        max_rpm = config.llm_max_rpm,
        "LLM client initialized"
    );
    Ok(Arc::new(ThrottledClient::new(
        client,
        config.llm_max_concurrency,
        config.llm_max_rpm,
    )))
}
