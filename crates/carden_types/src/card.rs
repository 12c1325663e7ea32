//! Generated card records.

use serde::{Deserialize, Serialize};

/// Maximum length of the front and back text, in characters.
pub const MAX_SIDE_CHARS: usize = 500;

/// Maximum length of the pronunciation string, in characters.
pub const MAX_PRONUNCIATION_CHARS: usize = 200;

/// Card difficulty as stored and exchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Normal => "NORMAL",
            Self::Hard => "HARD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "EASY" => Some(Self::Easy),
            "NORMAL" => Some(Self::Normal),
            "HARD" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Parse case-insensitively, defaulting to `Normal` for anything unknown.
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sanitized card produced by the generator and not yet persisted.
///
/// `display_order` is the 0-based position within the accepted batch; the
/// storage layer rebases it onto the deck's current maximum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCard {
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipa_pronunciation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antonyms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub display_order: u32,
}

impl CandidateCard {
    /// A bare front/back card with default difficulty and no extras.
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            ipa_pronunciation: None,
            examples: None,
            synonyms: None,
            antonyms: None,
            tags: None,
            difficulty: Difficulty::Normal,
            display_order: 0,
        }
    }

    pub fn with_display_order(mut self, display_order: u32) -> Self {
        self.display_order = display_order;
        self
    }
}

/// A single item that was dropped from a batch without failing the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSkip {
    /// Position of the item in the input it was taken from.
    pub index: usize,
    pub reason: String,
}

impl ItemSkip {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ItemSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card {}: {}", self.index + 1, self.reason)
    }
}
