//! Batch persistence with duplicate detection.
//!
//! One transaction per batch: re-check the deck, find the current maximum
//! display order, insert each card whose dedup key is not already live, and
//! bump the deck's aggregate count. Duplicates, and cards that would push the
//! deck past its capacity, are skipped per item; any storage error rolls the
//! whole batch back.

use carden_db::{CardStore, CardTransaction, DbError};
use carden_types::{CandidateCard, DeckId, DedupKey, ItemSkip, OwnerId};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Batch-level failure. Item-level duplicates never end up here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PersistenceFault {
    #[error("Deck validation failed")]
    DeckUnavailable,

    #[error("Storage error: {0}")]
    Storage(String),
}

enum SaveFailure {
    DeckUnavailable,
    Storage(DbError),
}

impl From<DbError> for SaveFailure {
    fn from(err: DbError) -> Self {
        Self::Storage(err)
    }
}

/// Outcome of one `save` call.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub success: bool,
    pub saved_count: usize,
    /// Skipped because a live card with the same dedup key exists.
    pub duplicate_count: usize,
    /// Skipped because the deck was full inside the transaction.
    pub over_capacity_count: usize,
    /// Live cards in the deck after this batch.
    pub card_count: i64,
    pub max_cards: i64,
    /// Cards not inserted: duplicates of live cards, or over capacity.
    pub skipped: Vec<ItemSkip>,
    pub errors: Vec<String>,
    pub message: String,
    pub fault: Option<PersistenceFault>,
}

impl SaveReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Nothing was saved and at least one card found the deck full.
    pub fn deck_full(&self) -> bool {
        self.saved_count == 0 && self.over_capacity_count > 0
    }

    fn failed(fault: PersistenceFault) -> Self {
        Self {
            success: false,
            saved_count: 0,
            duplicate_count: 0,
            over_capacity_count: 0,
            card_count: 0,
            max_cards: 0,
            skipped: Vec::new(),
            errors: vec![fault.to_string()],
            message: fault.to_string(),
            fault: Some(fault),
        }
    }
}

/// Collects per-item results while a batch is written.
#[derive(Debug, Default)]
struct SaveAccumulator {
    starting_count: i64,
    max_cards: i64,
    saved: usize,
    duplicates: usize,
    over_capacity: usize,
    skipped: Vec<ItemSkip>,
}

impl SaveAccumulator {
    fn new(starting_count: i64, max_cards: i64) -> Self {
        Self {
            starting_count,
            max_cards,
            ..Self::default()
        }
    }

    fn capacity(&self) -> usize {
        (self.max_cards - self.starting_count).max(0) as usize
    }

    fn record_saved(&mut self) {
        self.saved += 1;
    }

    fn record_duplicate(&mut self, index: usize, key: &DedupKey) {
        self.duplicates += 1;
        self.skipped
            .push(ItemSkip::new(index, format!("duplicate of an existing card ({})", key)));
    }

    fn record_over_capacity(&mut self, index: usize) {
        self.over_capacity += 1;
        self.skipped.push(ItemSkip::new(index, "deck capacity reached"));
    }

    fn into_report(self) -> SaveReport {
        let mut message = format!("Saved {} cards", self.saved);
        if self.duplicates > 0 {
            message.push_str(&format!(", skipped {} duplicates", self.duplicates));
        }
        if self.over_capacity > 0 {
            message.push_str(&format!(", {} over deck capacity", self.over_capacity));
        }
        SaveReport {
            success: true,
            saved_count: self.saved,
            duplicate_count: self.duplicates,
            over_capacity_count: self.over_capacity,
            card_count: self.starting_count + self.saved as i64,
            max_cards: self.max_cards,
            errors: self.skipped.iter().map(ToString::to_string).collect(),
            skipped: self.skipped,
            message,
            fault: None,
        }
    }
}

/// Writes candidate batches into decks.
#[derive(Clone)]
pub struct PersistenceCoordinator {
    store: Arc<dyn CardStore>,
}

impl PersistenceCoordinator {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, deck_id: DeckId, cards: &[CandidateCard], owner: Option<OwnerId>) -> SaveReport {
        match self.save_in_transaction(deck_id, cards, owner).await {
            Ok(accumulator) => {
                let report = accumulator.into_report();
                info!(
                    deck_id,
                    saved = report.saved_count,
                    skipped = report.skipped_count(),
                    "Card batch saved"
                );
                report
            }
            Err(SaveFailure::DeckUnavailable) => {
                warn!(deck_id, owner_id = ?owner, "Deck missing, deleted or not owned by caller");
                SaveReport::failed(PersistenceFault::DeckUnavailable)
            }
            Err(SaveFailure::Storage(err)) => {
                error!(deck_id, error = %err, "Card batch rolled back");
                SaveReport::failed(PersistenceFault::Storage(err.to_string()))
            }
        }
    }

    async fn save_in_transaction(
        &self,
        deck_id: DeckId,
        cards: &[CandidateCard],
        owner: Option<OwnerId>,
    ) -> Result<SaveAccumulator, SaveFailure> {
        let mut tx = self.store.begin(deck_id).await?;

        match write_batch(tx.as_mut(), deck_id, cards, owner).await {
            Ok(accumulator) => {
                tx.commit().await?;
                Ok(accumulator)
            }
            Err(failure) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(deck_id, error = %rollback_err, "Rollback failed");
                }
                Err(failure)
            }
        }
    }
}

async fn write_batch(
    tx: &mut dyn CardTransaction,
    deck_id: DeckId,
    cards: &[CandidateCard],
    owner: Option<OwnerId>,
) -> Result<SaveAccumulator, SaveFailure> {
    let deck = tx
        .find_deck(deck_id, owner)
        .await?
        .ok_or(SaveFailure::DeckUnavailable)?;
    let base_order = tx.max_display_order(deck_id).await?;
    let mut accumulator = SaveAccumulator::new(deck.card_count, deck.max_cards);
    let capacity = accumulator.capacity();

    for (index, card) in cards.iter().enumerate() {
        let key = DedupKey::new(&card.front, &card.back);
        if tx.has_live_card(deck_id, &key).await? {
            accumulator.record_duplicate(index, &key);
            continue;
        }
        if accumulator.saved >= capacity {
            accumulator.record_over_capacity(index);
            continue;
        }
        let display_order = base_order + accumulator.saved as i64 + 1;
        tx.insert_card(deck_id, card, &key, display_order).await?;
        accumulator.record_saved();
    }

    if accumulator.saved > 0 {
        tx.increment_card_count(deck_id, accumulator.saved as i64).await?;
    }
    Ok(accumulator)
}
