//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (API paths, date layout, overlaps, etc.)
//! - The plugin spec (credentials, websites, export window) and its validation
//! - CLI option types and parsing

mod constants;
mod spec;
mod types;

// Re-export all constants
pub use constants::*;
pub use spec::{PluginSpec, SyncWindow, WebsiteSpec};
pub(crate) use spec::start_of_day;
pub use types::{LogFormat, LogLevel, Opt, SyncConfig};
