//! Database implementations

pub mod manager;
pub mod queue_repository;

pub use manager::{DbManager, SCHEMA_VERSION};
pub use queue_repository::SqliteQueueStore;
