//! Configuration constants.
//!
//! Defaults and fixed values used by the export client, the cursor manager
//! and the CLI. Everything the API dictates (paths, parameter values, date
//! layout) lives here rather than as process-wide mutable state.

use std::time::Duration;

// Export API
/// Base URL of the Simple Analytics API.
pub const DEFAULT_BASE_URL: &str = "https://simpleanalytics.com";
/// Path of the export endpoint (shared by all three record kinds).
pub const EXPORT_PATH: &str = "/api/export/datapoints";
/// Export API version sent as the `version` query parameter.
pub const EXPORT_API_VERSION: &str = "5";
/// Export response format sent as the `format` query parameter.
pub const EXPORT_FORMAT: &str = "ndjson";
/// Content type hint sent with every export request.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

// Credential headers
pub const HEADER_USER_ID: &str = "User-Id";
pub const HEADER_API_KEY: &str = "Api-Key";

/// Date layout accepted by the export API and by `start_date`/`end_date`.
pub const DATE_LAYOUT: &str = "%Y-%m-%d";

/// Start of the export window when neither a cursor, `start_date` nor
/// `duration` is available. Simple Analytics holds no data before 2018.
pub const DEFAULT_START_DATE: &str = "2018-01-01";

// Cursor overlap per table
/// Overlap subtracted from the data points cursor.
pub const DATA_POINTS_OVERLAP: Duration = Duration::from_secs(15 * 60);
/// Overlap subtracted from the page views cursor.
pub const PAGE_VIEWS_OVERLAP: Duration = Duration::from_secs(24 * 60 * 60);
/// Default for `window_overlap_seconds` (events cursor overlap).
pub const DEFAULT_WINDOW_OVERLAP_SECS: u64 = 60;

/// Prefix of every per-website client identity (`simple-analytics:<hostname>`).
pub const CLIENT_ID_PREFIX: &str = "simple-analytics";

/// Prefix marking custom metadata fields in requests and NDJSON lines.
pub const METADATA_PREFIX: &str = "metadata.";

// Table names
pub const TABLE_DATA_POINTS: &str = "simple_analytics_data_points";
pub const TABLE_PAGE_VIEWS: &str = "simple_analytics_page_views";
pub const TABLE_EVENTS: &str = "simple_analytics_events";

/// Capacity of the producer/consumer channel inside one export.
///
/// Kept at one so the row sink sets the pace of the HTTP read.
pub const EXPORT_CHANNEL_CAPACITY: usize = 1;

/// Capacity of the channel feeding the JSONL writer task.
pub const WRITER_CHANNEL_CAPACITY: usize = 256;

/// Default HTTP timeout in seconds (covers the whole streamed export).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// User-Agent sent with export requests.
pub const DEFAULT_USER_AGENT: &str = concat!("simple_analytics_sync/", env!("CARGO_PKG_VERSION"));
