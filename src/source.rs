//! Per-website fan-out.
//!
//! [`SourceClient`] validates the plugin spec once and hands out one
//! [`WebsiteClient`] per configured website. Website clients share the API
//! client and the cursor store but nothing mutable; each syncs under its own
//! cursor key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::analytics::{ApiClient, ExportRequest, RecordKind};
use crate::config::{PluginSpec, WebsiteSpec, CLIENT_ID_PREFIX, METADATA_PREFIX};
use crate::cursor::{CursorManager, CursorStore};
use crate::error_handling::{ConfigError, SyncError};
use crate::pipeline::run_export;
use crate::sink::RecordSink;

/// Outcome of one successful table sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSyncReport {
    pub table: &'static str,
    pub client_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Records the sink accepted.
    pub records: u64,
    /// Cursor written after the sync; `None` without a store or when the
    /// window was empty.
    pub cursor: Option<String>,
}

/// Validated spec plus the shared API client and cursor store.
#[derive(Clone)]
pub struct SourceClient {
    spec: PluginSpec,
    api: ApiClient,
    cursors: CursorManager,
}

impl SourceClient {
    /// Validates `spec`, applies defaults and resolves the configured window
    /// against `now`.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found in the spec.
    pub fn new(
        spec: PluginSpec,
        api: ApiClient,
        store: Option<Arc<dyn CursorStore>>,
        now: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        spec.validate()?;
        let spec = spec.with_defaults(now);
        let window = spec.window(now)?;
        let cursors = CursorManager::new(store, window, spec.window_overlap());
        Ok(Self { spec, api, cursors })
    }

    /// Spec with defaults applied.
    pub fn spec(&self) -> &PluginSpec {
        &self.spec
    }

    /// One client per configured website, in spec order.
    pub fn websites(&self) -> Vec<WebsiteClient> {
        self.spec
            .websites
            .iter()
            .map(|website| WebsiteClient {
                api: self.api.clone(),
                cursors: self.cursors.clone(),
                website: website.clone(),
            })
            .collect()
    }
}

/// View of the source for a single website.
#[derive(Clone)]
pub struct WebsiteClient {
    api: ApiClient,
    cursors: CursorManager,
    website: WebsiteSpec,
}

impl WebsiteClient {
    /// Cursor key and log correlation id: `simple-analytics:<hostname>`.
    pub fn id(&self) -> String {
        format!("{}:{}", CLIENT_ID_PREFIX, self.website.hostname)
    }

    pub fn hostname(&self) -> &str {
        &self.website.hostname
    }

    /// Standard fields of `kind` followed by the website's custom metadata
    /// fields.
    pub fn fields(&self, kind: RecordKind) -> Vec<String> {
        kind.default_fields()
            .iter()
            .map(|f| f.to_string())
            .chain(
                self.website
                    .metadata_fields
                    .iter()
                    .map(|f| format!("{METADATA_PREFIX}{f}")),
            )
            .collect()
    }

    /// Syncs one table: resolves the window, runs the export into `sink`,
    /// flushes the sink and commits the next cursor if every record was
    /// delivered and flushed.
    ///
    /// A window whose start is after its end (a cursor past the configured
    /// end) is skipped without a request or a commit.
    ///
    /// # Errors
    ///
    /// Any error leaves the cursor untouched, except a failed cursor write,
    /// which is reported after the records were already delivered.
    pub async fn sync_table<S>(
        &self,
        kind: RecordKind,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<TableSyncReport, SyncError>
    where
        S: RecordSink + ?Sized,
    {
        let client_id = self.id();
        let table = kind.table_name();
        let start = self.cursors.resolve_start(kind, &client_id).await?;
        let end = self.cursors.resolve_end();
        let format = kind.timestamp_format();

        let mut report = TableSyncReport {
            table,
            client_id,
            start,
            end,
            records: 0,
            cursor: None,
        };

        if start > end {
            warn!(
                "[{}] skipping {table}: start {} is after end {}",
                report.client_id,
                format.format(start),
                format.format(end)
            );
            return Ok(report);
        }

        info!(
            "[{}] syncing {table} from {} to {}",
            report.client_id,
            format.format(start),
            format.format(end)
        );
        let request = ExportRequest {
            hostname: self.website.hostname.clone(),
            start,
            end,
            fields: self.fields(kind),
        };
        report.records = run_export(&self.api, kind, request, sink, cancel).await?;
        sink.flush().await?;
        report.cursor = self.cursors.commit(kind, &report.client_id, end).await?;

        info!(
            "[{}] synced {} records into {table}",
            report.client_id, report.records
        );
        Ok(report)
    }
}
