//! Storage primitives for the local SQLite queue database
//!
//! Provides an r2d2 connection pool with per-connection pragmas tuned for
//! durability, plus the storage error type.

pub mod error;
pub mod sqlite;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use sqlite::{apply_connection_pragmas, SqliteConnection, SqlitePool, SqlitePoolConfig};
