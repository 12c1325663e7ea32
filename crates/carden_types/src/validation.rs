//! Topic validation outcomes.

use serde::{Deserialize, Serialize};

/// Safety assessment of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Questionable,
    Unsafe,
    Blocked,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Questionable => "questionable",
            Self::Unsafe => "unsafe",
            Self::Blocked => "blocked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "safe" => Some(Self::Safe),
            "questionable" => Some(Self::Questionable),
            "unsafe" => Some(Self::Unsafe),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Whether generation may proceed at this tier.
    pub fn permits_generation(&self) -> bool {
        matches!(self, Self::Safe | Self::Questionable)
    }
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Educational quality assessment of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "fair" => Some(Self::Fair),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }
}

impl std::fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which assessment strategy produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSource {
    /// Empty input, rejected without any assessment.
    ShortCircuit,
    /// Model-backed assessment.
    Model,
    /// Deterministic rule-based assessment.
    Fallback,
}

/// Result of validating one topic. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub original_topic: String,
    pub approved: bool,
    /// Empty unless `approved`.
    pub sanitized_topic: String,
    pub message: String,
    pub suggestions: Vec<String>,
    pub warnings: Vec<String>,
    pub safety: SafetyLevel,
    pub quality: QualityLevel,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub source: ValidationSource,
}

impl ValidationOutcome {
    /// A rejection. The sanitized topic is left empty.
    pub fn rejected(
        original_topic: impl Into<String>,
        message: impl Into<String>,
        safety: SafetyLevel,
        quality: QualityLevel,
        source: ValidationSource,
    ) -> Self {
        Self {
            original_topic: original_topic.into(),
            approved: false,
            sanitized_topic: String::new(),
            message: message.into(),
            suggestions: Vec::new(),
            warnings: Vec::new(),
            safety,
            quality,
            confidence: 1.0,
            source,
        }
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}
