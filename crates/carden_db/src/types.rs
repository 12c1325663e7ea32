//! Row types for decks and cards.

use carden_types::{DeckId, Difficulty, OwnerId};
use serde::{Deserialize, Serialize};

/// Default capacity of a new deck.
pub const DEFAULT_MAX_CARDS: i64 = 30;

// ============================================================================
// Decks
// ============================================================================

/// A deck row (non-deleted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub id: DeckId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub cefr_level: Option<String>,
    /// Aggregate of live cards, maintained transactionally.
    pub card_count: i64,
    pub max_cards: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Parameters for creating a deck.
#[derive(Debug, Clone)]
pub struct NewDeck {
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    pub cefr_level: Option<String>,
    pub max_cards: i64,
}

impl NewDeck {
    pub fn new(owner_id: OwnerId, title: impl Into<String>) -> Self {
        Self {
            owner_id,
            title: title.into(),
            description: None,
            source_language: None,
            target_language: None,
            cefr_level: None,
            max_cards: DEFAULT_MAX_CARDS,
        }
    }

    pub fn with_max_cards(mut self, max_cards: i64) -> Self {
        self.max_cards = max_cards;
        self
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = Some(source.into());
        self.target_language = Some(target.into());
        self
    }
}

/// The slice of a deck the pipeline needs to gate a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckRef {
    pub id: DeckId,
    pub owner_id: OwnerId,
    pub card_count: i64,
    pub max_cards: i64,
}

/// Aggregate counter versus the live rows it should equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckCounts {
    pub aggregate: i64,
    pub live: i64,
}

impl DeckCounts {
    pub fn is_consistent(&self) -> bool {
        self.aggregate == self.live
    }
}

// ============================================================================
// Cards
// ============================================================================

/// A persisted card row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCard {
    pub id: i64,
    pub deck_id: DeckId,
    pub front: String,
    pub back: String,
    pub ipa_pronunciation: Option<String>,
    pub examples: Option<Vec<String>>,
    pub synonyms: Option<Vec<String>>,
    pub antonyms: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub unique_key: String,
    pub difficulty: Difficulty,
    pub display_order: i64,
    pub deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
