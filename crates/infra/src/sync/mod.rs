//! Background triggers for automatic synchronization

pub mod auto_sync;

pub use auto_sync::{AutoSyncTrigger, AutoSyncTriggerConfig};
