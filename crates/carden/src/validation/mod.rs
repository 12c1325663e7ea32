//! Topic validation.
//!
//! [`TopicValidator`] gates every generation request. Empty topics are
//! rejected on the spot. Anything else goes to the primary assessment
//! strategy (model-backed in production); if that strategy fails for any
//! reason the deterministic [`RuleBasedAssessor`] decides instead, so a
//! model outage never surfaces as a validation error.

mod model;
mod rules;

pub use model::ModelAssessor;
pub use rules::{title_case, RuleBasedAssessor, MIN_TOPIC_CHARS};

use async_trait::async_trait;
use carden_types::{QualityLevel, SafetyLevel, ValidationOutcome, ValidationSource};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::LlmError;

/// Suggestions offered when the topic is empty.
pub const EMPTY_TOPIC_SUGGESTIONS: [&str; 3] = ["Daily Conversations", "Basic Vocabulary", "Common Phrases"];

/// Why an assessment strategy could not produce an outcome.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),

    #[error("malformed assessment: {0}")]
    Malformed(String),
}

/// One way of judging a topic.
#[async_trait]
pub trait TopicAssessment: Send + Sync {
    /// Assess a trimmed, non-empty topic.
    async fn assess(&self, topic: &str) -> Result<ValidationOutcome, AssessmentError>;
}

/// Validator with a primary strategy and a deterministic fallback.
pub struct TopicValidator {
    primary: Option<Box<dyn TopicAssessment>>,
    fallback: RuleBasedAssessor,
}

impl TopicValidator {
    pub fn new(primary: Box<dyn TopicAssessment>) -> Self {
        Self {
            primary: Some(primary),
            fallback: RuleBasedAssessor,
        }
    }

    /// Validator that never calls a model.
    pub fn rules_only() -> Self {
        Self {
            primary: None,
            fallback: RuleBasedAssessor,
        }
    }

    pub async fn validate(&self, topic: &str) -> ValidationOutcome {
        let trimmed = topic.trim();
        if trimmed.is_empty() {
            return ValidationOutcome::rejected(
                "",
                "Topic cannot be empty. Please provide a topic for your flashcards.",
                SafetyLevel::Safe,
                QualityLevel::Poor,
                ValidationSource::ShortCircuit,
            )
            .with_suggestions(EMPTY_TOPIC_SUGGESTIONS);
        }

        let outcome = match &self.primary {
            Some(primary) => match primary.assess(trimmed).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(topic = trimmed, error = %err, "Topic assessment failed, using rule-based fallback");
                    self.fallback.evaluate(trimmed)
                }
            },
            None => self.fallback.evaluate(trimmed),
        };

        info!(
            topic = trimmed,
            approved = outcome.approved,
            safety = %outcome.safety,
            quality = %outcome.quality,
            source = ?outcome.source,
            "Topic validated"
        );
        outcome
    }
}
