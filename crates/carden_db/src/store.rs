//! Storage traits consumed by the generation pipeline.
//!
//! Reads that gate a request go through [`CardStore`]; the batch write runs
//! inside a [`CardTransaction`] whose boundary the caller controls.

use crate::decks::encode_list;
use crate::error::{DbError, Result};
use crate::types::DeckRef;
use crate::CardenDb;
use async_trait::async_trait;
use carden_types::{CandidateCard, DeckId, DedupKey, OwnerId};
use sqlx::{Row, Sqlite, Transaction};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Read access plus transaction creation.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Find a non-deleted deck, optionally requiring a matching owner.
    ///
    /// Returns `None` if the deck is missing, deleted, or owned by someone else.
    async fn find_deck(&self, deck_id: DeckId, owner: Option<OwnerId>) -> Result<Option<DeckRef>>;

    /// Number of non-deleted cards in a deck.
    async fn live_card_count(&self, deck_id: DeckId) -> Result<i64>;

    /// Open a write transaction scoped to one deck.
    ///
    /// Writers targeting the same deck are serialized until the returned
    /// transaction is committed, rolled back, or dropped.
    async fn begin(&self, deck_id: DeckId) -> Result<Box<dyn CardTransaction>>;
}

/// A write transaction. Dropping it without `commit` rolls it back.
#[async_trait]
pub trait CardTransaction: Send {
    async fn find_deck(&mut self, deck_id: DeckId, owner: Option<OwnerId>) -> Result<Option<DeckRef>>;

    /// Highest display order among live cards, 0 when the deck is empty.
    async fn max_display_order(&mut self, deck_id: DeckId) -> Result<i64>;

    /// Whether a live card with this key exists in the deck.
    async fn has_live_card(&mut self, deck_id: DeckId, key: &DedupKey) -> Result<bool>;

    /// Insert one card and return its row id.
    async fn insert_card(
        &mut self,
        deck_id: DeckId,
        card: &CandidateCard,
        key: &DedupKey,
        display_order: i64,
    ) -> Result<i64>;

    /// Add `by` to the deck's aggregate card count.
    async fn increment_card_count(&mut self, deck_id: DeckId, by: i64) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}

// ============================================================================
// SQLite implementation
// ============================================================================

const FIND_DECK_SQL: &str = "SELECT id, owner_id, card_count, max_cards FROM decks WHERE id = ? AND deleted = 0";

fn row_to_deck_ref(row: &sqlx::sqlite::SqliteRow, owner: Option<OwnerId>) -> Option<DeckRef> {
    let deck = DeckRef {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        card_count: row.get("card_count"),
        max_cards: row.get("max_cards"),
    };
    match owner {
        Some(owner_id) if owner_id != deck.owner_id => None,
        _ => Some(deck),
    }
}

#[async_trait]
impl CardStore for CardenDb {
    async fn find_deck(&self, deck_id: DeckId, owner: Option<OwnerId>) -> Result<Option<DeckRef>> {
        let row = sqlx::query(FIND_DECK_SQL)
            .bind(deck_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.and_then(|row| row_to_deck_ref(&row, owner)))
    }

    async fn live_card_count(&self, deck_id: DeckId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE deck_id = ? AND deleted = 0")
            .bind(deck_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn begin(&self, deck_id: DeckId) -> Result<Box<dyn CardTransaction>> {
        let guard = self.deck_lock(deck_id)?.lock_owned().await;
        let mut tx = self.pool.begin().await?;
        // Take SQLite's write lock before the first read; a deferred upgrade
        // fails on a stale snapshot without waiting.
        sqlx::query("UPDATE decks SET updated_at = updated_at WHERE id = ?")
            .bind(deck_id)
            .execute(&mut *tx)
            .await?;
        debug!(deck_id, "Write transaction opened");
        Ok(Box::new(SqliteCardTransaction {
            tx: Some(tx),
            _deck_guard: guard,
        }))
    }
}

/// SQLite transaction holding the deck's write lock.
pub struct SqliteCardTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
    _deck_guard: OwnedMutexGuard<()>,
}

impl SqliteCardTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| DbError::invalid_state("transaction already finished"))
    }
}

#[async_trait]
impl CardTransaction for SqliteCardTransaction {
    async fn find_deck(&mut self, deck_id: DeckId, owner: Option<OwnerId>) -> Result<Option<DeckRef>> {
        let tx = self.tx()?;
        let row = sqlx::query(FIND_DECK_SQL)
            .bind(deck_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.and_then(|row| row_to_deck_ref(&row, owner)))
    }

    async fn max_display_order(&mut self, deck_id: DeckId) -> Result<i64> {
        let tx = self.tx()?;
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(display_order), 0) FROM cards WHERE deck_id = ? AND deleted = 0",
        )
        .bind(deck_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(max)
    }

    async fn has_live_card(&mut self, deck_id: DeckId, key: &DedupKey) -> Result<bool> {
        let tx = self.tx()?;
        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM cards WHERE deck_id = ? AND unique_key = ? AND deleted = 0 LIMIT 1",
        )
        .bind(deck_id)
        .bind(key.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(existing.is_some())
    }

    async fn insert_card(
        &mut self,
        deck_id: DeckId,
        card: &CandidateCard,
        key: &DedupKey,
        display_order: i64,
    ) -> Result<i64> {
        let examples = encode_list(card.examples.as_ref())?;
        let synonyms = encode_list(card.synonyms.as_ref())?;
        let antonyms = encode_list(card.antonyms.as_ref())?;
        let tags = encode_list(card.tags.as_ref())?;
        let now = CardenDb::now_millis();

        let tx = self.tx()?;
        let result = sqlx::query(
            r#"
            INSERT INTO cards (deck_id, front, back, ipa_pronunciation, examples, synonyms,
                               antonyms, tags, unique_key, difficulty, display_order, deleted,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(deck_id)
        .bind(&card.front)
        .bind(&card.back)
        .bind(&card.ipa_pronunciation)
        .bind(examples)
        .bind(synonyms)
        .bind(antonyms)
        .bind(tags)
        .bind(key.as_str())
        .bind(card.difficulty.as_str())
        .bind(display_order)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(|e| DbError::from_write(e, "duplicate card key"))?;

        Ok(result.last_insert_rowid())
    }

    async fn increment_card_count(&mut self, deck_id: DeckId, by: i64) -> Result<()> {
        let tx = self.tx()?;
        let result = sqlx::query("UPDATE decks SET card_count = card_count + ?, updated_at = ? WHERE id = ?")
            .bind(by)
            .bind(CardenDb::now_millis())
            .bind(deck_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("deck {}", deck_id)));
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DbError::invalid_state("transaction already finished"))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}
