//! Export window resolution and cursor commits for one website.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};

use crate::analytics::RecordKind;
use crate::config::SyncWindow;
use crate::cursor::CursorStore;
use crate::error_handling::StoreError;

/// Resolves start/end for each table sync and advances cursors after
/// successful ones.
///
/// Without a store every sync covers the configured window and nothing is
/// committed.
#[derive(Clone)]
pub struct CursorManager {
    store: Option<Arc<dyn CursorStore>>,
    window: SyncWindow,
    window_overlap: Duration,
}

impl CursorManager {
    pub fn new(
        store: Option<Arc<dyn CursorStore>>,
        window: SyncWindow,
        window_overlap: Duration,
    ) -> Self {
        Self {
            store,
            window,
            window_overlap,
        }
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Start of the next export: the stored cursor if there is one, else the
    /// configured start.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be read or the stored value does not parse
    /// in the table's timestamp format.
    pub async fn resolve_start(
        &self,
        kind: RecordKind,
        client_id: &str,
    ) -> Result<DateTime<Utc>, StoreError> {
        let Some(store) = &self.store else {
            return Ok(self.window.start);
        };
        let table = kind.table_name();
        match store.get(table, client_id).await? {
            Some(value) if !value.trim().is_empty() => {
                let start = kind.timestamp_format().parse(value.trim()).map_err(|e| {
                    StoreError::InvalidCursor {
                        table,
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
                info!("[{client_id}] cursor found for {table}: {value}");
                Ok(start)
            }
            _ => {
                debug!("[{client_id}] no cursor for {table}, starting at the configured start");
                Ok(self.window.start)
            }
        }
    }

    /// End of the next export; the same for every table.
    pub fn resolve_end(&self) -> DateTime<Utc> {
        self.window.end
    }

    /// Cursor to store after a successful export ending at `end`:
    /// `end - overlap`, in the table's timestamp format.
    pub fn next_cursor(&self, kind: RecordKind, end: DateTime<Utc>) -> String {
        let overlap =
            TimeDelta::from_std(kind.overlap(self.window_overlap)).unwrap_or(TimeDelta::MAX);
        let cursor = end
            .checked_sub_signed(overlap)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        kind.timestamp_format().format(cursor)
    }

    /// Stores the next cursor. Call only after the export drained without error.
    ///
    /// Returns the stored value, or `None` without a store.
    pub async fn commit(
        &self,
        kind: RecordKind,
        client_id: &str,
        end: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let cursor = self.next_cursor(kind, end);
        store.set(kind.table_name(), client_id, &cursor).await?;
        info!(
            "[{client_id}] cursor for {} advanced to {cursor}",
            kind.table_name()
        );
        Ok(Some(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::MemoryCursorStore;
    use chrono::TimeZone;

    const CLIENT: &str = "simple-analytics:example.com";

    fn window() -> SyncWindow {
        SyncWindow {
            start: Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    fn manager(store: Option<Arc<dyn CursorStore>>) -> CursorManager {
        CursorManager::new(store, window(), Duration::from_secs(60))
    }

    #[test]
    fn test_next_cursor_per_kind() {
        let m = manager(None);
        let end = window().end;
        assert_eq!(m.next_cursor(RecordKind::PageViews, end), "2023-01-31");
        assert_eq!(m.next_cursor(RecordKind::Events, end), "2023-01-31");
        assert_eq!(
            m.next_cursor(RecordKind::DataPoints, end),
            "2023-01-31T23:45:00Z"
        );
    }

    #[test]
    fn test_next_cursor_events_uses_configured_overlap() {
        let m = CursorManager::new(None, window(), Duration::ZERO);
        assert_eq!(m.next_cursor(RecordKind::Events, window().end), "2023-02-01");
    }

    #[tokio::test]
    async fn test_resolve_start_without_store_uses_window() {
        let m = manager(None);
        assert!(!m.has_store());
        assert_eq!(
            m.resolve_start(RecordKind::Events, CLIENT).await.unwrap(),
            window().start
        );
        assert_eq!(m.resolve_end(), window().end);
        assert_eq!(
            m.commit(RecordKind::Events, CLIENT, window().end)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_resolve_start_uses_stored_cursor() {
        let store = Arc::new(MemoryCursorStore::new());
        store
            .set(RecordKind::PageViews.table_name(), CLIENT, "2023-01-01")
            .await
            .unwrap();
        store
            .set(
                RecordKind::DataPoints.table_name(),
                CLIENT,
                "2023-01-15T10:30:00Z",
            )
            .await
            .unwrap();
        let m = manager(Some(store));

        assert_eq!(
            m.resolve_start(RecordKind::PageViews, CLIENT).await.unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            m.resolve_start(RecordKind::DataPoints, CLIENT).await.unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 15, 10, 30, 0).unwrap()
        );
        // No cursor for events yet
        assert_eq!(
            m.resolve_start(RecordKind::Events, CLIENT).await.unwrap(),
            window().start
        );
    }

    #[tokio::test]
    async fn test_empty_cursor_is_treated_as_absent() {
        let store = Arc::new(MemoryCursorStore::new());
        store
            .set(RecordKind::Events.table_name(), CLIENT, "")
            .await
            .unwrap();
        let m = manager(Some(store));
        assert_eq!(
            m.resolve_start(RecordKind::Events, CLIENT).await.unwrap(),
            window().start
        );
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_an_error() {
        let store = Arc::new(MemoryCursorStore::new());
        // A date cursor is not valid for the RFC 3339 data points table
        store
            .set(RecordKind::DataPoints.table_name(), CLIENT, "2023-01-01")
            .await
            .unwrap();
        let m = manager(Some(store));
        let err = m
            .resolve_start(RecordKind::DataPoints, CLIENT)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidCursor {
                table: "simple_analytics_data_points",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_commit_writes_next_cursor() {
        let store = Arc::new(MemoryCursorStore::new());
        let m = manager(Some(store.clone()));
        let stored = m
            .commit(RecordKind::PageViews, CLIENT, window().end)
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some("2023-01-31"));
        assert_eq!(
            store
                .get(RecordKind::PageViews.table_name(), CLIENT)
                .await
                .unwrap()
                .as_deref(),
            Some("2023-01-31")
        );
    }
}
