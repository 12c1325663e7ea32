//! Deck and card queries outside the generation write path.

use crate::error::{DbError, Result};
use crate::types::*;
use crate::CardenDb;
use carden_types::{DeckId, Difficulty};
use sqlx::Row;
use tracing::info;

impl CardenDb {
    // ========================================================================
    // Decks
    // ========================================================================

    /// Create a deck and return its id.
    pub async fn create_deck(&self, deck: &NewDeck) -> Result<DeckId> {
        if deck.max_cards < 0 {
            return Err(DbError::constraint("max_cards must not be negative"));
        }
        let now = Self::now_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO decks (owner_id, title, description, source_language, target_language,
                               cefr_level, card_count, max_cards, deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, 0, ?, ?)
            "#,
        )
        .bind(deck.owner_id)
        .bind(&deck.title)
        .bind(&deck.description)
        .bind(&deck.source_language)
        .bind(&deck.target_language)
        .bind(&deck.cefr_level)
        .bind(deck.max_cards)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(deck_id = id, owner_id = deck.owner_id, "Deck created");
        Ok(id)
    }

    /// Get a non-deleted deck by id.
    pub async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>> {
        let row = sqlx::query("SELECT * FROM decks WHERE id = ? AND deleted = 0")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Deck {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            description: row.get("description"),
            source_language: row.get("source_language"),
            target_language: row.get("target_language"),
            cefr_level: row.get("cefr_level"),
            card_count: row.get("card_count"),
            max_cards: row.get("max_cards"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Soft-delete a deck. Its cards stay but are no longer reachable.
    pub async fn soft_delete_deck(&self, id: DeckId) -> Result<bool> {
        let result = sqlx::query("UPDATE decks SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0")
            .bind(Self::now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Aggregate counter and live row count for a deck.
    pub async fn deck_counts(&self, id: DeckId) -> Result<DeckCounts> {
        let row = sqlx::query(
            r#"
            SELECT d.card_count AS aggregate,
                   (SELECT COUNT(*) FROM cards c WHERE c.deck_id = d.id AND c.deleted = 0) AS live
            FROM decks d
            WHERE d.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(format!("deck {}", id)))?;

        Ok(DeckCounts {
            aggregate: row.get("aggregate"),
            live: row.get("live"),
        })
    }

    // ========================================================================
    // Cards
    // ========================================================================

    /// Live cards of a deck in display order.
    pub async fn list_cards(&self, deck_id: DeckId) -> Result<Vec<StoredCard>> {
        let rows = sqlx::query(
            "SELECT * FROM cards WHERE deck_id = ? AND deleted = 0 ORDER BY display_order ASC, id ASC",
        )
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_card).collect()
    }

    /// Soft-delete one card and decrement its deck's aggregate in the same
    /// transaction. Returns false if the card was already gone.
    pub async fn soft_delete_card(&self, card_id: i64) -> Result<bool> {
        let deck_id: Option<DeckId> = sqlx::query_scalar("SELECT deck_id FROM cards WHERE id = ?")
            .bind(card_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(deck_id) = deck_id else {
            return Ok(false);
        };

        let lock = self.deck_lock(deck_id)?;
        let _guard = lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let now = Self::now_millis();

        let result = sqlx::query("UPDATE cards SET deleted = 1, updated_at = ? WHERE id = ? AND deleted = 0")
            .bind(now)
            .bind(card_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE decks SET card_count = card_count - 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(deck_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

pub(crate) fn encode_list(list: Option<&Vec<String>>) -> Result<Option<String>> {
    match list {
        Some(items) if !items.is_empty() => Ok(Some(serde_json::to_string(items)?)),
        _ => Ok(None),
    }
}

fn decode_list(raw: Option<String>) -> Result<Option<Vec<String>>> {
    match raw {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

fn row_to_card(row: &sqlx::sqlite::SqliteRow) -> Result<StoredCard> {
    let difficulty_str: String = row.get("difficulty");
    let difficulty = Difficulty::parse(&difficulty_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown difficulty: {}", difficulty_str)))?;

    Ok(StoredCard {
        id: row.get("id"),
        deck_id: row.get("deck_id"),
        front: row.get("front"),
        back: row.get("back"),
        ipa_pronunciation: row.get("ipa_pronunciation"),
        examples: decode_list(row.get("examples"))?,
        synonyms: decode_list(row.get("synonyms"))?,
        antonyms: decode_list(row.get("antonyms"))?,
        tags: decode_list(row.get("tags"))?,
        unique_key: row.get("unique_key"),
        difficulty,
        display_order: row.get("display_order"),
        deleted: row.get::<i64, _>("deleted") != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
