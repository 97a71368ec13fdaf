//! Export record types and the per-line decoder.
//!
//! Field names follow the export API schema
//! (<https://docs.simpleanalytics.com/api/export-data-points>). Custom
//! `metadata.*` fields are schemaless, so every line is decoded twice: once
//! into a generic JSON map, from which non-null `metadata.*` entries are
//! split off, and once into the typed record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analytics::kind::RecordKind;
use crate::config::METADATA_PREFIX;

/// Custom metadata of one record, keyed without the `metadata.` prefix.
/// Never contains `null` values.
pub type Metadata = BTreeMap<String, Value>;

/// Standard fields of a data point.
pub const DATA_POINT_FIELDS: &[&str] = &[
    "added_unix",
    "added_iso",
    "hostname",
    "hostname_original",
    "path",
    "query",
    "is_unique",
    "is_robot",
    "document_referrer",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_content",
    "utm_term",
    "scrolled_percentage",
    "duration_seconds",
    "viewport_width",
    "viewport_height",
    "screen_width",
    "screen_height",
    "user_agent",
    "device_type",
    "country_code",
    "browser_name",
    "browser_version",
    "os_name",
    "os_version",
    "lang_region",
    "lang_language",
    "uuid",
];

/// Standard fields of a page view.
///
/// Page views are data points filtered by `type=pageviews`, so the set is
/// intentionally the same as [`DATA_POINT_FIELDS`]. The page views table keys
/// on `(hostname, uuid)` where data points key on `uuid` alone.
pub const PAGE_VIEW_FIELDS: &[&str] = DATA_POINT_FIELDS;

/// Standard fields of an event.
pub const EVENT_FIELDS: &[&str] = &[
    "added_unix",
    "added_iso",
    "hostname",
    "hostname_original",
    "path",
    "query",
    "datapoint",
    "is_robot",
    "document_referrer",
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_content",
    "utm_term",
    "viewport_width",
    "viewport_height",
    "screen_width",
    "screen_height",
    "user_agent",
    "device_type",
    "country_code",
    "browser_name",
    "browser_version",
    "os_name",
    "os_version",
    "lang_region",
    "lang_language",
];

/// One data point (or page view) from the export API.
///
/// Absent and `null` fields take their zero value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DataPoint {
    pub added_unix: u64,
    pub added_iso: Option<DateTime<Utc>>,
    pub hostname: String,
    pub hostname_original: String,
    pub path: String,
    pub query: String,
    pub is_unique: bool,
    pub is_robot: bool,
    pub document_referrer: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_content: String,
    pub utm_term: String,
    pub scrolled_percentage: f64,
    pub duration_seconds: f64,
    pub viewport_width: i64,
    pub viewport_height: i64,
    pub screen_width: i64,
    pub screen_height: i64,
    pub user_agent: String,
    pub device_type: String,
    pub country_code: String,
    pub browser_name: String,
    pub browser_version: String,
    pub os_name: String,
    pub os_version: String,
    pub lang_region: String,
    pub lang_language: String,
    pub uuid: String,
    /// Derived from `metadata.*` fields; not part of the typed schema.
    #[serde(skip)]
    pub metadata: Metadata,
}

/// Page views share the data point schema.
pub type PageView = DataPoint;

/// One event from the export API.
///
/// Events carry no unique key; downstream identity must be synthetic.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Event {
    pub added_unix: u64,
    pub added_iso: Option<DateTime<Utc>>,
    pub hostname: String,
    pub hostname_original: String,
    pub path: String,
    pub query: String,
    /// Event name.
    pub datapoint: String,
    pub is_robot: bool,
    pub document_referrer: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_content: String,
    pub utm_term: String,
    pub viewport_width: i64,
    pub viewport_height: i64,
    pub screen_width: i64,
    pub screen_height: i64,
    pub user_agent: String,
    pub device_type: String,
    pub country_code: String,
    pub browser_name: String,
    pub browser_version: String,
    pub os_name: String,
    pub os_version: String,
    pub lang_region: String,
    pub lang_language: String,
    /// Derived from `metadata.*` fields; not part of the typed schema.
    #[serde(skip)]
    pub metadata: Metadata,
}

/// A decoded export record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    DataPoint(DataPoint),
    PageView(PageView),
    Event(Event),
}

impl Record {
    /// Kind the record was exported as.
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::DataPoint(_) => RecordKind::DataPoints,
            Record::PageView(_) => RecordKind::PageViews,
            Record::Event(_) => RecordKind::Events,
        }
    }

    pub fn table_name(&self) -> &'static str {
        self.kind().table_name()
    }

    pub fn hostname(&self) -> &str {
        match self {
            Record::DataPoint(r) | Record::PageView(r) => &r.hostname,
            Record::Event(r) => &r.hostname,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Record::DataPoint(r) | Record::PageView(r) => &r.metadata,
            Record::Event(r) => &r.metadata,
        }
    }

    /// Primary key columns: `[uuid]` for data points, `[hostname, uuid]` for
    /// page views, none for events.
    pub fn primary_key(&self) -> Option<Vec<&str>> {
        match self {
            Record::DataPoint(r) => Some(vec![r.uuid.as_str()]),
            Record::PageView(r) => Some(vec![r.hostname.as_str(), r.uuid.as_str()]),
            Record::Event(_) => None,
        }
    }

    /// Flattens the record into one output row: `table`, the typed fields
    /// and a `metadata` object.
    pub fn to_row(&self) -> Result<Value, serde_json::Error> {
        let typed = match self {
            Record::DataPoint(r) | Record::PageView(r) => serde_json::to_value(r)?,
            Record::Event(r) => serde_json::to_value(r)?,
        };
        let mut row = Map::new();
        row.insert(
            "table".to_string(),
            Value::String(self.table_name().to_string()),
        );
        if let Value::Object(fields) = typed {
            row.extend(fields);
        }
        row.insert(
            "metadata".to_string(),
            Value::Object(self.metadata().clone().into_iter().collect()),
        );
        Ok(Value::Object(row))
    }
}

/// Splits a decoded line into typed fields and metadata.
///
/// `metadata.*` keys with non-null values go to the metadata map with the
/// prefix stripped. Null values are dropped everywhere, so typed fields that
/// are `null` fall back to their zero value.
fn split_metadata(fields: Map<String, Value>) -> (Map<String, Value>, Metadata) {
    let mut typed = Map::new();
    let mut metadata = Metadata::new();
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        match key.strip_prefix(METADATA_PREFIX) {
            Some(name) => {
                metadata.insert(name.to_string(), value);
            }
            None => {
                typed.insert(key, value);
            }
        }
    }
    (typed, metadata)
}

/// Decodes one NDJSON line into a record of the given kind.
///
/// # Errors
///
/// Fails if the line is not a JSON object or a known field has the wrong type.
pub fn decode_line(kind: RecordKind, line: &[u8]) -> Result<Record, serde_json::Error> {
    let fields: Map<String, Value> = serde_json::from_slice(line)?;
    let (typed, metadata) = split_metadata(fields);
    let typed = Value::Object(typed);

    let record = match kind {
        RecordKind::DataPoints => Record::DataPoint(DataPoint {
            metadata,
            ..serde_json::from_value::<DataPoint>(typed)?
        }),
        RecordKind::PageViews => Record::PageView(PageView {
            metadata,
            ..serde_json::from_value::<PageView>(typed)?
        }),
        RecordKind::Events => Record::Event(Event {
            metadata,
            ..serde_json::from_value::<Event>(typed)?
        }),
    };
    Ok(record)
}
