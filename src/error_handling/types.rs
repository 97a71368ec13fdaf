//! Error type definitions.
//!
//! This module defines all error types used throughout the application.

use std::path::PathBuf;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use reqwest::StatusCode;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Invalid or missing plugin spec fields. The sync never starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The spec file could not be read.
    #[error("could not read spec file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spec file is not a valid spec document.
    #[error("could not parse spec: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required field is missing or empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The website list is empty.
    #[error("at least one website is required")]
    NoWebsites,

    /// A website entry has no hostname.
    #[error("every website entry must have a hostname (entry {index} has none)")]
    EmptyHostname { index: usize },

    /// A date does not match the `YYYY-MM-DD` layout.
    #[error("could not parse {field}: {value:?} does not match YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    /// A look-back period is malformed.
    #[error("could not validate duration {0:?} (should be a number followed by \"d\", \"m\" or \"y\", e.g. \"7d\", \"1m\" or \"3y\")")]
    InvalidDuration(String),

    /// The configured window ends before it starts.
    #[error("end_date {end} is before start_date {start}")]
    InvalidWindow { start: String, end: String },
}

/// Error types for cursor store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Schema migration error.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A stored cursor does not match the table's timestamp format.
    #[error("failed to parse cursor {value:?} for {table}: {reason}")]
    InvalidCursor {
        table: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors surfaced by one table sync.
///
/// None of these are retried; a failed sync leaves the cursor untouched so the
/// next run covers the same window again.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The API could not be reached, or the connection broke mid-stream.
    #[error("transport error: {0}")]
    Transport(#[source] ReqwestError),

    /// The API answered with a non-200 status.
    #[error("status {code} ({})", reason(*.code))]
    HttpStatus { code: u16, body: String },

    /// A response line is not valid JSON for the record kind.
    #[error("failed to decode JSON on line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing the cursor failed.
    #[error("cursor store error: {0}")]
    Store(#[from] StoreError),

    /// The row sink rejected a record.
    #[error("row sink error: {0}")]
    Sink(String),

    /// The sync was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// The producer task panicked or was aborted.
    #[error("export task failed: {0}")]
    TaskFailed(String),
}

impl SyncError {
    /// Status code of an `HttpStatus` error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SyncError::HttpStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

fn reason(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unknown status")
}
