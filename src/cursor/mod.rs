//! Sync cursors.
//!
//! A cursor is one string per `(table, client_id)` marking how far the last
//! successful sync got, minus a per-table overlap. It is read once before an
//! export and written once after the export drained without error.

mod manager;
mod store;

pub use manager::CursorManager;
pub use store::{CursorStore, MemoryCursorStore};
