//! Mock model provider for deterministic tests
//!
//! Provides canned responses without network calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{LlmError, ModelConfig, ModelProvider};

/// A single queued reply
#[derive(Debug)]
pub enum CannedResponse {
    /// Text content, optionally after a delay (simulates a slow model)
    Text { text: String, delay_ms: u64 },
    /// Fail the call with this error
    Error(LlmError),
}

impl CannedResponse {
    /// Create a simple text response
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            text: content.into(),
            delay_ms: 0,
        }
    }

    /// Create a response with simulated delay
    pub fn with_delay(content: impl Into<String>, delay_ms: u64) -> Self {
        Self::Text {
            text: content.into(),
            delay_ms,
        }
    }

    /// Create a failing response
    pub fn error(err: LlmError) -> Self {
        Self::Error(err)
    }
}

/// Mock provider with deterministic responses
///
/// Responses are queued and consumed in order. If no responses are queued,
/// returns an error (to catch test configuration issues).
#[derive(Clone, Default)]
pub struct MockModelProvider {
    responses: Arc<Mutex<VecDeque<CannedResponse>>>,
    /// Record of prompts received (for assertions)
    received_prompts: Arc<Mutex<Vec<String>>>,
}

impl MockModelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next `complete` call
    pub fn queue_response(&self, response: CannedResponse) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Queue multiple responses
    pub fn queue_responses(&self, responses: impl IntoIterator<Item = CannedResponse>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.extend(responses);
        }
    }

    /// Get all prompts received by this provider
    pub fn received_prompts(&self) -> Vec<String> {
        self.received_prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    /// Number of `complete` calls made so far
    pub fn call_count(&self) -> usize {
        self.received_prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Check how many responses are still queued
    pub fn responses_remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ModelProvider for MockModelProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    fn model(&self) -> &str {
        "mock-test-model"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn complete(&self, prompt: &str, _config: &ModelConfig) -> Result<String, LlmError> {
        self.received_prompts
            .lock()
            .map_err(|_| LlmError::Internal("mock prompt log poisoned".to_string()))?
            .push(prompt.to_string());

        let response = self
            .responses
            .lock()
            .map_err(|_| LlmError::Internal("mock response queue poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| {
                LlmError::Internal(
                    "MockModelProvider: No responses queued! Queue responses before calling complete"
                        .to_string(),
                )
            })?;

        match response {
            CannedResponse::Text { text, delay_ms } => {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Ok(text)
            }
            CannedResponse::Error(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_returns_queued_responses_in_order() {
        let provider = MockModelProvider::new();
        provider.queue_responses([CannedResponse::text("first"), CannedResponse::text("second")]);

        let config = ModelConfig::default();
        assert_eq!(provider.complete("a", &config).await.unwrap(), "first");
        assert_eq!(provider.complete("b", &config).await.unwrap(), "second");
        assert_eq!(provider.received_prompts(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.responses_remaining(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_returns_queued_error() {
        let provider = MockModelProvider::new();
        provider.queue_response(CannedResponse::error(LlmError::Http("503".to_string())));

        let err = provider.complete("x", &ModelConfig::default()).await.unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_error_when_no_response() {
        let provider = MockModelProvider::new();
        let result = provider.complete("hi", &ModelConfig::default()).await;
        assert!(matches!(result, Err(LlmError::Internal(_))));
    }
}
