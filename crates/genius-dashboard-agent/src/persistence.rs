//! `SQLite` persistence layer.

use crate::boards::BoardStore;
use crate::migrations::{self, MigrationError, CURRENT_VERSION};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

/// `SQLite`-backed board store persistence.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r"
            -- The persisted board store, one row
            CREATE TABLE IF NOT EXISTS board_store (
                id INTEGER PRIMARY KEY CHECK (id = 0),
                version INTEGER NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    /// Load the board store, migrated to the current version.
    ///
    /// Returns `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or the stored payload cannot be
    /// migrated.
    pub fn load(&self) -> Result<Option<BoardStore>, StoreError> {
        let row: Option<(u32, String)> = self
            .conn
            .query_row(
                "SELECT version, payload FROM board_store WHERE id = 0",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((version, payload)) = row else {
            return Ok(None);
        };

        let raw: serde_json::Value = serde_json::from_str(&payload)?;
        let store = migrations::migrate(raw, version)?;
        tracing::debug!(version, boards = store.boards.len(), "Loaded board store");

        if version != CURRENT_VERSION {
            self.save(&store)?;
        }

        Ok(Some(store))
    }

    /// Save the board store at the current version.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails.
    pub fn save(&self, store: &BoardStore) -> Result<(), StoreError> {
        let payload = serde_json::to_string(store)?;
        let updated_at = Utc::now().to_rfc3339();

        self.conn.execute(
            r"
            INSERT OR REPLACE INTO board_store (id, version, payload, updated_at)
            VALUES (0, ?1, ?2, ?3)
            ",
            (CURRENT_VERSION, payload, updated_at),
        )?;

        tracing::debug!(boards = store.boards.len(), "Saved board store");
        Ok(())
    }

    /// Write a raw payload at an arbitrary version.
    #[cfg(test)]
    fn save_raw(&self, version: u32, payload: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO board_store (id, version, payload, updated_at) VALUES (0, ?1, ?2, ?3)",
            (version, payload, Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }

    #[cfg(test)]
    fn stored_version(&self) -> Result<u32, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT version FROM board_store WHERE id = 0", [], |row| row.get(0))?)
    }
}

/// Errors that can occur with the board store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database failure
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Payload is not valid JSON for a board store
    #[error("invalid board store payload: {0}")]
    Json(#[from] serde_json::Error),
    /// Payload could not be migrated
    #[error(transparent)]
    Migration(#[from] MigrationError),
}
