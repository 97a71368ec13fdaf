//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::analytics::RecordKind;
use crate::config::constants::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::config::spec::PluginSpec;
use crate::error_handling::ConfigError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use simple_analytics_sync::config::{PluginSpec, SyncConfig};
/// use std::path::PathBuf;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SyncConfig {
///     spec: PluginSpec::from_file(&PathBuf::from("spec.json"))?,
///     state_db: Some(PathBuf::from("cursors.db")),
///     ..Default::default()
/// };
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Plugin spec (credentials, websites, window)
    pub spec: PluginSpec,

    /// SQLite cursor database; `None` disables incremental cursors
    pub state_db: Option<PathBuf>,

    /// Tables to sync, in order
    pub tables: Vec<RecordKind>,

    /// JSONL output file; `None` writes to stdout
    pub output: Option<PathBuf>,

    /// Base URL of the export API
    pub base_url: String,

    /// HTTP timeout in seconds
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    pub user_agent: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            spec: PluginSpec::default(),
            state_db: None,
            tables: RecordKind::all().to_vec(),
            output: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Command-line options.
///
/// # Examples
///
/// ```bash
/// # Full sync of every table, cursors kept in cursors.db
/// simple_analytics_sync --spec spec.json --state-db cursors.db --output export.jsonl
///
/// # Only page views, credentials from the environment
/// SIMPLE_ANALYTICS_API_KEY=sa_api_key_xxx simple_analytics_sync --spec spec.json --table page-views
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "simple_analytics_sync",
    about = "Incrementally exports Simple Analytics data points, page views and events as JSON Lines."
)]
pub struct Opt {
    /// Plugin spec file (JSON)
    #[arg(long, value_parser)]
    pub spec: PathBuf,

    /// SQLite database holding sync cursors (omit to re-fetch the full window every run)
    #[arg(long, value_parser)]
    pub state_db: Option<PathBuf>,

    /// Table to sync (repeatable, default: all)
    #[arg(long = "table", value_enum)]
    pub tables: Vec<RecordKind>,

    /// Output file for JSONL records (default: stdout)
    #[arg(long, value_parser)]
    pub output: Option<PathBuf>,

    /// Simple Analytics user ID (overrides the spec file)
    #[arg(long, env = "SIMPLE_ANALYTICS_USER_ID")]
    pub user_id: Option<String>,

    /// Simple Analytics API key (overrides the spec file)
    #[arg(long, env = "SIMPLE_ANALYTICS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the export API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// HTTP timeout in seconds (covers the whole streamed export)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Opt {
    /// Loads the spec file and merges CLI overrides into a [`SyncConfig`].
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the spec file cannot be read or parsed.
    pub fn into_config(self) -> Result<SyncConfig, ConfigError> {
        let mut spec = PluginSpec::from_file(&self.spec)?;
        if let Some(user_id) = self.user_id {
            spec.user_id = user_id;
        }
        if let Some(api_key) = self.api_key {
            spec.api_key = api_key;
        }

        let tables = if self.tables.is_empty() {
            RecordKind::all().to_vec()
        } else {
            let mut tables = self.tables;
            tables.dedup();
            tables
        };

        Ok(SyncConfig {
            spec,
            state_db: self.state_db,
            tables,
            output: self.output,
            base_url: self.base_url,
            timeout_seconds: self.timeout_seconds,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }
}
