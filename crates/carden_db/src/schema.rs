//! Database schema creation for decks and cards.
//!
//! All CREATE TABLE statements live here - single source of truth.

use crate::error::Result;
use crate::CardenDb;
use tracing::info;

impl CardenDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS decks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                source_language TEXT,
                target_language TEXT,
                cefr_level TEXT,
                card_count INTEGER NOT NULL DEFAULT 0,
                max_cards INTEGER NOT NULL DEFAULT 30,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                deck_id INTEGER NOT NULL REFERENCES decks(id),
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                ipa_pronunciation TEXT,
                examples TEXT,
                synonyms TEXT,
                antonyms TEXT,
                tags TEXT,
                unique_key TEXT NOT NULL,
                difficulty TEXT NOT NULL DEFAULT 'NORMAL',
                display_order INTEGER NOT NULL,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_decks_owner ON decks(owner_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id, deleted)")
            .execute(&self.pool)
            .await?;
        // Backstop for the dedup check: one live card per key per deck.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_cards_live_key ON cards(deck_id, unique_key) WHERE deleted = 0",
        )
        .execute(&self.pool)
        .await?;

        info!("Database schema verified");
        Ok(())
    }
}
