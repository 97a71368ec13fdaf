//! Cursor store abstraction and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error_handling::StoreError;

/// Key-value storage for sync cursors, keyed by `(table, client_id)`.
///
/// Implementations only need get-then-set semantics; syncs of the same
/// table and website are never run concurrently.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Stored cursor, `None` if there is none yet.
    async fn get(&self, table: &str, client_id: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value`, replacing any previous cursor for the key.
    async fn set(&self, table: &str, client_id: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-local cursor store.
#[derive(Debug, Default)]
pub struct MemoryCursorStore {
    cursors: RwLock<HashMap<(String, String), String>>,
}

impl MemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cursors.
    pub async fn len(&self) -> usize {
        self.cursors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cursors.read().await.is_empty()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn get(&self, table: &str, client_id: &str) -> Result<Option<String>, StoreError> {
        let cursors = self.cursors.read().await;
        Ok(cursors
            .get(&(table.to_string(), client_id.to_string()))
            .cloned())
    }

    async fn set(&self, table: &str, client_id: &str, value: &str) -> Result<(), StoreError> {
        self.cursors
            .write()
            .await
            .insert((table.to_string(), client_id.to_string()), value.to_string());
        Ok(())
    }
}
