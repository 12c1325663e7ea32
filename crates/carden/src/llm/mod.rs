//! Model Provider Abstraction
//!
//! The pipeline treats the generative model as a single capability:
//! `complete(prompt, config) -> text`. Providers either return the full text
//! or an error; truncated output is always reported as [`LlmError::Truncated`].

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub use gemini::GeminiProvider;
pub use mock::{CannedResponse, MockModelProvider};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during model calls
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not found or invalid
    #[error("API key error: {0}")]
    ApiKey(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: retry after {retry_after_ms}ms")]
    RateLimit { retry_after_ms: u64 },

    /// The call did not finish in time
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    /// Output stopped at the token limit
    #[error("Model output truncated: {0}")]
    Truncated(String),

    /// The provider refused the prompt or the output
    #[error("Model response blocked: {0}")]
    Blocked(String),

    /// No text in the response
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Request Configuration
// =============================================================================

/// Hint for the shape of the expected output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Configuration for one model call
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model identifier (e.g., "gemini-2.0-flash-exp")
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for sampling (0.0 - 1.0)
    pub temperature: Option<f32>,

    /// System prompt
    pub system: Option<String>,

    pub response_format: ResponseFormat,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            max_tokens: 1024,
            temperature: None,
            system: None,
            response_format: ResponseFormat::Text,
        }
    }
}

impl ModelConfig {
    /// Create config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set max tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Request JSON output
    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Trait for model providers
///
/// Implementations must be thread-safe; one provider is shared by every
/// request in the process.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Get the provider name (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Get the default model
    fn model(&self) -> &str;

    /// Check if the provider is configured and ready
    fn is_ready(&self) -> bool;

    /// Send a prompt and return the complete response text
    async fn complete(&self, prompt: &str, config: &ModelConfig) -> Result<String, LlmError>;
}

/// Run `complete` with an upper bound on wall-clock time.
///
/// A provider that is not ready is never called.
pub async fn complete_with_timeout(
    provider: &dyn ModelProvider,
    prompt: &str,
    config: &ModelConfig,
    timeout: Duration,
) -> Result<String, LlmError> {
    if !provider.is_ready() {
        return Err(LlmError::ApiKey(format!("{} provider is not configured", provider.name())));
    }
    match tokio::time::timeout(timeout, provider.complete(prompt, config)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(provider = provider.name(), model = provider.model(), ?timeout, "Model call timed out");
            Err(LlmError::Timeout(timeout))
        }
    }
}
