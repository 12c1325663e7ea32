//! Storage layer for Carden decks and cards.
//!
//! The pipeline talks to storage only through the [`CardStore`] and
//! [`CardTransaction`] traits; [`CardenDb`] is the SQLite implementation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use carden_db::{CardenDb, NewDeck, Result};
//!
//! let db = CardenDb::open("~/.carden/carden.sqlite3").await?;
//! let deck_id = db.create_deck(&NewDeck::new(42, "Animals")).await?;
//! let deck = db.get_deck(deck_id).await?;
//! ```

mod decks;
mod error;
mod schema;
mod store;
mod types;

pub use error::{DbError, Result};
pub use store::{CardStore, CardTransaction, SqliteCardTransaction};
pub use types::*;

use carden_types::DeckId;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// How long a writer waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type DeckLocks = Arc<Mutex<HashMap<DeckId, Arc<tokio::sync::Mutex<()>>>>>;

/// SQLite-backed deck and card storage.
///
/// Cloning is cheap; clones share the pool and the per-deck write locks.
#[derive(Clone)]
pub struct CardenDb {
    pool: SqlitePool,
    deck_locks: DeckLocks,
}

impl CardenDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self::from_pool(pool);
        db.ensure_schema().await?;

        info!(path = %path.display(), "Database opened");

        Ok(db)
    }

    /// Open a private in-memory database (used by tests and dry runs).
    ///
    /// The pool holds a single connection that never expires, since every
    /// SQLite memory connection is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self::from_pool(pool);
        db.ensure_schema().await?;
        Ok(db)
    }

    fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            deck_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the underlying connection pool (escape hatch for complex queries).
    ///
    /// Prefer using the typed methods instead.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Write lock for one deck, created on first use.
    ///
    /// Entries nobody holds or waits on are dropped first, so the table only
    /// grows with the number of decks being written concurrently.
    pub(crate) fn deck_lock(&self, deck_id: DeckId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .deck_locks
            .lock()
            .map_err(|_| DbError::invalid_state("deck lock table poisoned"))?;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(Arc::clone(locks.entry(deck_id).or_default()))
    }

    #[cfg(test)]
    fn tracked_deck_locks(&self) -> usize {
        self.deck_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

// Timestamp utilities
impl CardenDb {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_else(chrono::Utc::now)
    }
}
