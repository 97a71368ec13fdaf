//! SQLite connection pool for the cursor database.
//!
//! The file is created on first use and opened in WAL mode so that several
//! website syncs can commit cursors while others read theirs.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use log::{debug, error, info};
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::error_handling::StoreError;

/// Opens (creating if needed) the cursor database at `db_path`.
///
/// # Errors
///
/// `StoreError::FileCreationError` if the file cannot be created,
/// `StoreError::SqlError` if SQLite refuses the connection or the WAL pragma.
pub async fn init_db_pool_with_path(db_path: &Path) -> Result<Arc<Pool<Sqlite>>, StoreError> {
    let db_path_str = db_path.to_string_lossy().to_string();
    match OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&db_path_str)
    {
        Ok(_) => info!("Cursor database created at {db_path_str}"),
        Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("Using existing cursor database at {db_path_str}")
        }
        Err(e) => {
            error!("Failed to create cursor database file: {e}");
            return Err(StoreError::FileCreationError(e.to_string()));
        }
    }

    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path_str))
        .await
        .map_err(|e| {
            error!("Failed to connect to cursor database: {e}");
            StoreError::SqlError(e)
        })?;

    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await
        .map_err(|e| {
            error!("Failed to set WAL mode: {e}");
            StoreError::SqlError(e)
        })?;

    Ok(Arc::new(pool))
}
