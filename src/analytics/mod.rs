//! Simple Analytics export API.
//!
//! - [`ApiClient`]: authenticated GET requests, HTTP status classification
//! - [`ExportRequest`] / [`ApiClient::export`]: query building and the
//!   streaming NDJSON decode loop
//! - [`Record`]: typed data points, page views and events with their metadata

mod client;
mod export;
mod kind;
mod ndjson;
mod records;

pub use client::ApiClient;
pub use export::ExportRequest;
pub use kind::{RecordKind, TimestampFormat};
pub use records::{
    decode_line, DataPoint, Event, Metadata, PageView, Record, DATA_POINT_FIELDS, EVENT_FIELDS,
    PAGE_VIEW_FIELDS,
};
