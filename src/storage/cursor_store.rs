//! SQLite-backed [`CursorStore`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::cursor::CursorStore;
use crate::error_handling::StoreError;

use super::{init_db_pool_with_path, run_migrations};

/// Cursor store persisted in the `sync_cursors` table.
#[derive(Debug, Clone)]
pub struct SqliteCursorStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteCursorStore {
    /// Wraps a pool whose schema is already migrated.
    pub fn new(pool: Arc<Pool<Sqlite>>) -> Self {
        Self { pool }
    }

    /// Opens the database at `db_path`, creating and migrating it if needed.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let pool = init_db_pool_with_path(db_path).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl CursorStore for SqliteCursorStore {
    async fn get(&self, table: &str, client_id: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM sync_cursors WHERE table_name = ? AND client_id = ?",
        )
        .bind(table)
        .bind(client_id)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(value)
    }

    async fn set(&self, table: &str, client_id: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_cursors (table_name, client_id, value, updated_at_ms)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(table_name, client_id) DO UPDATE SET
                value = excluded.value,
                updated_at_ms = excluded.updated_at_ms",
        )
        .bind(table)
        .bind(client_id)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}
