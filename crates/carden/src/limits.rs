//! Deck capacity checks.

use carden_db::CardStore;
use carden_types::DeckId;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Result of a capacity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitCheck {
    pub valid: bool,
    pub current_count: i64,
    pub requested: i64,
    pub max_cards: i64,
    pub remaining_slots: i64,
    pub message: String,
}

/// Decides whether a batch fits within a deck's capacity.
///
/// Reads the live card count; a failed read rejects the batch.
#[derive(Clone)]
pub struct DeckLimitGuard {
    store: Arc<dyn CardStore>,
}

impl DeckLimitGuard {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self { store }
    }

    pub async fn check_limit(&self, deck_id: DeckId, requested: i64, max_cards: i64) -> LimitCheck {
        let current_count = match self.store.live_card_count(deck_id).await {
            Ok(count) => count,
            Err(err) => {
                error!(deck_id, error = %err, "Card count unavailable, rejecting batch");
                return LimitCheck {
                    valid: false,
                    current_count: 0,
                    requested,
                    max_cards,
                    remaining_slots: 0,
                    message: format!("Could not verify deck capacity: {}", err),
                };
            }
        };

        let remaining_slots = (max_cards - current_count).max(0);
        let valid = requested >= 0 && current_count + requested <= max_cards;
        let message = if valid {
            format!(
                "Deck has room for {} cards ({} remaining)",
                requested, remaining_slots
            )
        } else {
            format!(
                "Deck limit exceeded: {} cards present, {} requested, limit {} ({} remaining)",
                current_count, requested, max_cards, remaining_slots
            )
        };
        debug!(deck_id, current_count, requested, max_cards, valid, "Deck limit checked");

        LimitCheck {
            valid,
            current_count,
            requested,
            max_cards,
            remaining_slots,
            message,
        }
    }
}
