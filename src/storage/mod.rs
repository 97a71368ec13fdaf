//! Persistent cursor storage in SQLite.

mod cursor_store;
mod migrations;
mod pool;

pub use cursor_store::SqliteCursorStore;
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
