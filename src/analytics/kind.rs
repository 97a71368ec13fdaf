//! Record kinds and their per-kind policies.
//!
//! All three kinds go through the same export endpoint and pipeline; they
//! differ only in the standard field set, the `type` query parameter, the
//! timestamp format used for the window and cursor, and the cursor overlap.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use clap::ValueEnum;
use strum_macros::{Display, EnumIter};

use crate::analytics::records::{DATA_POINT_FIELDS, EVENT_FIELDS, PAGE_VIEW_FIELDS};
use crate::config::{
    DATA_POINTS_OVERLAP, DATE_LAYOUT, PAGE_VIEWS_OVERLAP, TABLE_DATA_POINTS, TABLE_EVENTS,
    TABLE_PAGE_VIEWS,
};

/// Kind of record requested from the export API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum RecordKind {
    /// Generic data points (no `type` parameter).
    DataPoints,
    /// Page views (`type=pageviews`).
    PageViews,
    /// Events (`type=events`).
    Events,
}

/// Textual timestamp format of the export window and of stored cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339 with second precision (`2023-01-31T23:45:00Z`)
    Rfc3339,
}

impl TimestampFormat {
    /// Formats a timestamp. `Date` truncates to the day.
    pub fn format(self, t: DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Date => t.format(DATE_LAYOUT).to_string(),
            TimestampFormat::Rfc3339 => t.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Parses a timestamp written by [`TimestampFormat::format`].
    pub fn parse(self, value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match self {
            TimestampFormat::Date => {
                NaiveDate::parse_from_str(value, DATE_LAYOUT).map(crate::config::start_of_day)
            }
            TimestampFormat::Rfc3339 => {
                DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
            }
        }
    }
}

impl RecordKind {
    /// Every kind, in sync order.
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::DataPoints,
            RecordKind::PageViews,
            RecordKind::Events,
        ]
    }

    /// Destination table name; also the first half of the cursor key.
    pub fn table_name(self) -> &'static str {
        match self {
            RecordKind::DataPoints => TABLE_DATA_POINTS,
            RecordKind::PageViews => TABLE_PAGE_VIEWS,
            RecordKind::Events => TABLE_EVENTS,
        }
    }

    /// Value of the `type` query parameter, if any.
    pub fn export_type(self) -> Option<&'static str> {
        match self {
            RecordKind::DataPoints => None,
            RecordKind::PageViews => Some("pageviews"),
            RecordKind::Events => Some("events"),
        }
    }

    /// Standard fields requested when the caller supplies none.
    pub fn default_fields(self) -> &'static [&'static str] {
        match self {
            RecordKind::DataPoints => DATA_POINT_FIELDS,
            RecordKind::PageViews => PAGE_VIEW_FIELDS,
            RecordKind::Events => EVENT_FIELDS,
        }
    }

    /// Data points use RFC 3339; page views and events use the date layout.
    pub fn timestamp_format(self) -> TimestampFormat {
        match self {
            RecordKind::DataPoints => TimestampFormat::Rfc3339,
            RecordKind::PageViews | RecordKind::Events => TimestampFormat::Date,
        }
    }

    /// Overlap subtracted from the window end when computing the next cursor.
    ///
    /// `window_overlap` is the configured `window_overlap_seconds` and only
    /// applies to events.
    pub fn overlap(self, window_overlap: Duration) -> Duration {
        match self {
            RecordKind::DataPoints => DATA_POINTS_OVERLAP,
            RecordKind::PageViews => PAGE_VIEWS_OVERLAP,
            RecordKind::Events => window_overlap,
        }
    }
}
