//! simple_analytics_sync library: incremental Simple Analytics exports
//!
//! Pulls data points, page views and events from the Simple Analytics export
//! API as streamed NDJSON, decodes each line into a typed record plus its
//! custom `metadata.*` fields, and hands the records to a row sink. A per
//! table, per website cursor is advanced only after an export drained
//! without error, minus an overlap, so every record is delivered at least
//! once.
//!
//! # Example
//!
//! ```no_run
//! use simple_analytics_sync::config::{PluginSpec, SyncConfig};
//! use simple_analytics_sync::run_sync;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig {
//!     spec: PluginSpec::from_file(std::path::Path::new("spec.json"))?,
//!     state_db: Some(std::path::PathBuf::from("cursors.db")),
//!     ..Default::default()
//! };
//!
//! let report = run_sync(config, CancellationToken::new()).await?;
//! println!("Synced {} records ({} failed tables)",
//!          report.total_records, report.failures.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

pub mod analytics;
pub mod config;
pub mod cursor;
mod error_handling;
pub mod initialization;
mod pipeline;
mod run;
mod sink;
mod source;
mod storage;

// Re-export public API
pub use analytics::{ApiClient, ExportRequest, Record, RecordKind};
pub use config::{LogFormat, LogLevel, PluginSpec, SyncConfig, WebsiteSpec};
pub use cursor::{CursorManager, CursorStore, MemoryCursorStore};
pub use error_handling::{ConfigError, InitializationError, StoreError, SyncError};
pub use pipeline::run_export;
pub use run::{run_sync, SyncReport, TableFailure};
pub use sink::{start_jsonl_writer, JsonlSink, JsonlWriter, RecordSink};
pub use source::{SourceClient, TableSyncReport, WebsiteClient};
pub use storage::{init_db_pool_with_path, run_migrations, SqliteCursorStore};
