//! Key/value persistence backend using SQLite
//!
//! The conversation store persists whole collections as JSON payloads
//! under string keys, mirroring the per-browser storage layout the
//! product started with. One table is enough for that.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Persistent string key → JSON payload store.
pub struct StateStore {
    pool: SqlitePool,
}

impl StateStore {
    /// Open (or create) the database at the given path.
    pub async fn new(db_path: &Path) -> Result<Self, sqlx::Error> {
        // Create parent directories if they don't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create an in-memory store for testing.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS app_state (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace the payload stored under `key`.
    pub async fn save(&self, key: &str, payload: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO app_state (key, payload, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = datetime('now')
            "#,
        )
        .bind(key)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the payload stored under `key`, if any.
    pub async fn load(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM app_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(payload,)| payload))
    }
}
