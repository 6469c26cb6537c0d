//! Infrastructure layer - external adapters (database, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod local_storage;
pub mod session_store;
pub mod sqlite_storage;

pub use config::{ensure_config_exists, load_config, load_config_from_file};
pub use local_storage::LocalStorage;
pub use session_store::FileSessionStore;
pub use sqlite_storage::SqliteStorage;
