//! Card generation requests.

use serde::{Deserialize, Serialize};

use crate::DeckId;

/// CEFR proficiency level used to calibrate vocabulary difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            "C1" => Some(Self::C1),
            "C2" => Some(Self::C2),
            _ => None,
        }
    }
}

impl std::fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CefrLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown CEFR level '{}' (expected A1-C2)", s))
    }
}

/// A request to generate a batch of cards into a deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub deck_id: DeckId,
    pub topic: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_source_language")]
    pub source_language: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(default)]
    pub cefr_level: Option<CefrLevel>,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub include_examples: bool,
    #[serde(default = "default_true")]
    pub include_pronunciation: bool,
}

impl GenerationRequest {
    /// A request with the default languages and feature flags.
    pub fn new(deck_id: DeckId, topic: impl Into<String>, count: u32) -> Self {
        Self {
            deck_id,
            topic: topic.into(),
            count,
            source_language: default_source_language(),
            target_language: default_target_language(),
            cefr_level: None,
            keywords: None,
            include_examples: true,
            include_pronunciation: true,
        }
    }

    /// Copy of this request with the topic replaced (used for the sanitized topic).
    pub fn with_topic(&self, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..self.clone()
        }
    }

    /// Keywords with blanks removed; `None` when nothing is left.
    pub fn effective_keywords(&self) -> Option<Vec<&str>> {
        let keywords: Vec<&str> = self
            .keywords
            .as_deref()?
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect();
        if keywords.is_empty() {
            None
        } else {
            Some(keywords)
        }
    }
}

fn default_count() -> u32 { 10 }
fn default_source_language() -> String { "en".to_string() }
fn default_target_language() -> String { "vi".to_string() }
fn default_true() -> bool { true }
