//! SQLite State Store
//!
//! SQLite-backed implementation of the state store contract. Snapshots live
//! in a single `engine_state` table keyed by the engine's storage key, so the
//! backup survives process restarts and crashes.

use crate::storage::{StateStore, StoreError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;

/// SQLite-backed state store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if necessary) the database at `url` and ensure the
    /// state table exists.
    ///
    /// # Arguments
    /// * `url` - Database connection URL (e.g., "sqlite://batcher.db")
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS engine_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        info!("State store ready at {}", url);
        Ok(Self { pool })
    }
}

#[async_trait]
impl StateStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM engine_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO engine_state (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = format!("sqlite://{}", dir.path().join("state.db").display());
        let store = SqliteStore::connect(&url).await.expect("connect");

        // Never-written key reads as absent
        assert_eq!(store.get("batch").await.unwrap(), None);

        store.set("batch", "{\"items\":[]}").await.unwrap();
        assert_eq!(
            store.get("batch").await.unwrap().as_deref(),
            Some("{\"items\":[]}")
        );

        // Second write upserts over the first
        store.set("batch", "{\"items\":[1]}").await.unwrap();
        assert_eq!(
            store.get("batch").await.unwrap().as_deref(),
            Some("{\"items\":[1]}")
        );
    }
}
