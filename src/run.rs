//! Sync entry point: every configured website, every requested table.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::analytics::{ApiClient, RecordKind};
use crate::config::SyncConfig;
use crate::cursor::CursorStore;
use crate::initialization::init_client;
use crate::sink::{start_jsonl_writer, JsonlSink, JsonlWriter};
use crate::source::{SourceClient, TableSyncReport, WebsiteClient};
use crate::storage::SqliteCursorStore;

/// A table sync that did not complete. Its cursor was not advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFailure {
    pub client_id: String,
    pub table: &'static str,
    pub error: String,
}

/// Results of a sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Completed table syncs
    pub tables: Vec<TableSyncReport>,
    /// Failed table syncs
    pub failures: Vec<TableFailure>,
    /// Records written to the output
    pub total_records: u64,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Syncs every website in the spec and writes the records as JSON Lines.
///
/// Websites sync concurrently; the tables of one website sync one after the
/// other so that no two exports share a cursor key. A failed table is
/// recorded in the report and the run continues with the next one.
/// Cancelling `cancel` stops every in-flight export without committing
/// their cursors. A table's cursor is only committed once its records were
/// flushed to the output.
///
/// # Errors
///
/// Fails before any export if the spec is invalid, the cursor database or
/// the output cannot be opened, or the HTTP client cannot be built. Fails
/// after the exports if the output could not be written.
///
/// # Example
///
/// ```no_run
/// use simple_analytics_sync::config::{PluginSpec, SyncConfig};
/// use simple_analytics_sync::run_sync;
/// use std::path::PathBuf;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SyncConfig {
///     spec: PluginSpec::from_file(&PathBuf::from("spec.json"))?,
///     state_db: Some(PathBuf::from("cursors.db")),
///     output: Some(PathBuf::from("export.jsonl")),
///     ..Default::default()
/// };
/// let report = run_sync(config, CancellationToken::new()).await?;
/// println!("{} records, {} failed tables", report.total_records, report.failures.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_sync(config: SyncConfig, cancel: CancellationToken) -> Result<SyncReport> {
    let started = Instant::now();
    config.spec.validate().context("Invalid plugin spec")?;

    let http = init_client(config.timeout_seconds, &config.user_agent)
        .context("Failed to initialize HTTP client")?;
    let api = ApiClient::new(
        config.spec.user_id.clone(),
        config.spec.api_key.clone(),
        http,
    )
    .with_base_url(config.base_url.clone());

    let store: Option<Arc<dyn CursorStore>> = match &config.state_db {
        Some(path) => {
            let store = SqliteCursorStore::open(path)
                .await
                .with_context(|| format!("Failed to open cursor database {}", path.display()))?;
            Some(Arc::new(store) as Arc<dyn CursorStore>)
        }
        None => {
            warn!("No state database configured, every run fetches the full window");
            None
        }
    };

    let source = SourceClient::new(config.spec.clone(), api, store, Utc::now())
        .context("Invalid plugin spec")?;

    let writer: Box<dyn Write + Send> = match &config.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let (writer, writer_handle) = start_jsonl_writer(JsonlSink::new(writer));

    let websites = source.websites();
    info!(
        "Syncing {} table(s) for {} website(s)",
        config.tables.len(),
        websites.len()
    );

    let mut tasks = FuturesUnordered::new();
    for website in websites {
        let client_id = website.id();
        let handle = tokio::spawn(sync_website(
            website,
            config.tables.clone(),
            writer.clone(),
            cancel.clone(),
        ));
        tasks.push(async move { (client_id, handle.await) });
    }
    drop(writer);

    let mut report = SyncReport::default();
    while let Some((client_id, joined)) = tasks.next().await {
        match joined {
            Ok(outcome) => {
                report.tables.extend(outcome.tables);
                report.failures.extend(outcome.failures);
            }
            Err(e) => {
                error!("[{client_id}] sync task failed: {e}");
                report.failures.push(TableFailure {
                    client_id,
                    table: "*",
                    error: e.to_string(),
                });
            }
        }
    }

    let written = writer_handle
        .await
        .context("Output writer task failed")?
        .context("Failed to write output")?;

    report.total_records = written;
    report.elapsed_seconds = started.elapsed().as_secs_f64();
    info!(
        "Sync finished: {} table(s) synced, {} failed, {} records in {:.1}s",
        report.tables.len(),
        report.failures.len(),
        report.total_records,
        report.elapsed_seconds
    );
    Ok(report)
}

#[derive(Debug, Default)]
struct WebsiteOutcome {
    tables: Vec<TableSyncReport>,
    failures: Vec<TableFailure>,
}

async fn sync_website(
    website: WebsiteClient,
    tables: Vec<RecordKind>,
    mut writer: JsonlWriter,
    cancel: CancellationToken,
) -> WebsiteOutcome {
    let mut outcome = WebsiteOutcome::default();
    for kind in tables {
        if cancel.is_cancelled() {
            break;
        }
        match website.sync_table(kind, &mut writer, &cancel).await {
            Ok(table) => outcome.tables.push(table),
            Err(e) => {
                error!("[{}] {} sync failed: {e}", website.id(), kind.table_name());
                outcome.failures.push(TableFailure {
                    client_id: website.id(),
                    table: kind.table_name(),
                    error: e.to_string(),
                });
            }
        }
    }
    outcome
}
