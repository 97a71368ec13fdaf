//! Error handling.
//!
//! Errors are split by where they stop a run:
//! - **Config**: invalid spec, the sync never starts
//! - **Transport / HttpStatus / Decode**: the export failed, no cursor commit
//! - **Store**: the cursor could not be read (nothing fetched) or written
//!   (records already delivered, cursor not advanced)
//! - **Sink / Cancelled**: the consumer side stopped the export

mod types;

// Re-export public API
pub use types::{ConfigError, InitializationError, StoreError, SyncError};
