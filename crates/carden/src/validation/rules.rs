//! Deterministic rule-based topic assessment.

use async_trait::async_trait;
use carden_types::{QualityLevel, SafetyLevel, ValidationOutcome, ValidationSource};
use regex::Regex;
use std::sync::LazyLock;

use super::{AssessmentError, TopicAssessment};

/// Topics shorter than this (in characters) are too vague to generate from.
pub const MIN_TOPIC_CHARS: usize = 3;

/// Substrings that reject a topic outright (matched against the lower-cased topic).
const BLOCKED_SUBSTRINGS: &[&str] = &[
    "hack",
    "exploit",
    "adult",
    "violence",
    "illegal",
    "harm",
    "ignore instructions",
    "system:",
    "jailbreak",
];

/// Short tokens that only block as whole words ("dan" but not "dance").
static BLOCKED_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdan\b").expect("blocked word pattern is valid")
});

const PLACEHOLDER_TOPICS: &[&str] = &["abc", "xyz", "test", "123"];

const UNSAFE_SUGGESTIONS: [&str; 3] = ["Science and Technology", "History and Culture", "Language Learning"];
const VAGUE_SUGGESTIONS: [&str; 3] = ["Animals and Nature", "Food and Cooking", "Travel and Transportation"];

const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Keyword and length rules. Pure and independent of any model.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedAssessor;

impl RuleBasedAssessor {
    /// Whether the topic hits the blocklist.
    pub fn is_blocked(topic: &str) -> bool {
        let lower = topic.to_lowercase();
        BLOCKED_SUBSTRINGS.iter().any(|pattern| lower.contains(pattern)) || BLOCKED_WORDS.is_match(&lower)
    }

    /// Whether the topic is too short or a known placeholder.
    pub fn is_too_vague(topic: &str) -> bool {
        let trimmed = topic.trim();
        trimmed.chars().count() < MIN_TOPIC_CHARS
            || PLACEHOLDER_TOPICS
                .iter()
                .any(|placeholder| trimmed.eq_ignore_ascii_case(placeholder))
    }

    pub fn evaluate(&self, topic: &str) -> ValidationOutcome {
        let topic = topic.trim();

        if Self::is_blocked(topic) {
            return ValidationOutcome::rejected(
                topic,
                "Content appears inappropriate. Please choose an educational topic.",
                SafetyLevel::Unsafe,
                QualityLevel::Poor,
                ValidationSource::Fallback,
            )
            .with_suggestions(UNSAFE_SUGGESTIONS)
            .with_warning("Content safety check failed")
            .with_confidence(FALLBACK_CONFIDENCE);
        }

        if Self::is_too_vague(topic) {
            return ValidationOutcome::rejected(
                topic,
                "Please provide a more specific topic for better flashcards.",
                SafetyLevel::Safe,
                QualityLevel::Poor,
                ValidationSource::Fallback,
            )
            .with_suggestions(VAGUE_SUGGESTIONS)
            .with_warning("Topic too vague or generic")
            .with_confidence(FALLBACK_CONFIDENCE);
        }

        ValidationOutcome {
            original_topic: topic.to_string(),
            approved: true,
            sanitized_topic: title_case(topic),
            message: "Topic approved for card generation.".to_string(),
            suggestions: Vec::new(),
            warnings: vec!["Used fallback validation".to_string()],
            safety: SafetyLevel::Safe,
            quality: QualityLevel::Fair,
            confidence: FALLBACK_CONFIDENCE,
            source: ValidationSource::Fallback,
        }
    }
}

#[async_trait]
impl TopicAssessment for RuleBasedAssessor {
    async fn assess(&self, topic: &str) -> Result<ValidationOutcome, AssessmentError> {
        Ok(self.evaluate(topic))
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
///
/// A word starts after any character that is neither alphanumeric nor an
/// apostrophe, so "rock-climbing" becomes "Rock-Climbing".
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.trim().chars() {
        if ch.is_alphanumeric() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            in_word = ch == '\'' && in_word;
            out.push(ch);
        }
    }
    out
}
