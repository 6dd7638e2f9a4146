//! # FieldSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The SQLite queue store (`rusqlite` + `r2d2`)
//! - The HTTP remote client for media upload and record creation
//! - The host-fed connectivity probe
//! - The auto-sync trigger worker
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `fieldsync-core`
//! - Depends on `fieldsync-common`, `fieldsync-domain` and `fieldsync-core`
//! - Contains all "impure" code (I/O, network, timers)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod platform;
pub mod remote;
pub mod sync;

// Re-export commonly used items
pub use database::{DbManager, SqliteQueueStore, SCHEMA_VERSION};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
pub use platform::SharedConnectivityProbe;
pub use remote::RemoteApiClient;
pub use sync::{AutoSyncTrigger, AutoSyncTriggerConfig};
