//! Gemini Provider Implementation
//!
//! Implements [`ModelProvider`] against the Generative Language REST API
//! (`models/{model}:generateContent`).
//!
//! # Configuration
//!
//! - API key: read from the environment variable named by `model.api_key_env`
//!   (default `GEMINI_API_KEY`)
//! - Model and endpoint: `[model]` section of `config.toml`

use super::{LlmError, ModelConfig, ModelProvider, ResponseFormat};
use crate::config::ModelSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// =============================================================================
// API Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    candidate_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// =============================================================================
// Gemini Provider
// =============================================================================

/// Gemini API provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new provider with an explicit API key
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Create a provider from the `[model]` settings, reading the key from
    /// the configured environment variable.
    pub fn from_settings(settings: &ModelSettings) -> Result<Self, LlmError> {
        let api_key = settings.api_key().ok_or_else(|| {
            LlmError::ApiKey(format!(
                "{} environment variable not set or empty",
                settings.api_key_env
            ))
        })?;
        Ok(Self::new(api_key, &settings.base_url, &settings.model))
    }

    fn build_request(prompt: &str, config: &ModelConfig) -> GenerateRequest {
        GenerateRequest {
            contents: vec![ApiContent {
                role: Some("user".to_string()),
                parts: vec![ApiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            system_instruction: config.system.as_ref().map(|system| ApiContent {
                role: None,
                parts: vec![ApiPart {
                    text: Some(system.clone()),
                }],
            }),
            generation_config: ApiGenerationConfig {
                candidate_count: 1,
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
                response_mime_type: match config.response_format {
                    ResponseFormat::Json => Some("application/json"),
                    ResponseFormat::Text => None,
                },
            },
        }
    }

    /// Pull the text out of a response, turning every incomplete outcome
    /// into an error.
    fn extract_text(response: GenerateResponse) -> Result<String, LlmError> {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::Blocked(format!("prompt blocked: {}", reason)));
        }

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => {
                return Err(LlmError::Truncated("finish reason MAX_TOKENS".to_string()));
            }
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                return Err(LlmError::Blocked(format!("finish reason {}", reason)));
            }
            _ => {}
        }

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(&self, prompt: &str, config: &ModelConfig) -> Result<String, LlmError> {
        let model = if config.model.is_empty() {
            self.model.as_str()
        } else {
            config.model.as_str()
        };
        let request = Self::build_request(prompt, config);
        debug!(model, prompt_chars = prompt.chars().count(), "Calling Gemini");

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                warn!(model, "Gemini rate limit hit");
                return Err(LlmError::RateLimit {
                    retry_after_ms: 60_000,
                });
            }

            return Err(LlmError::Http(format!("HTTP {}: {}", status, error_text)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Self::extract_text(body)
    }
}
