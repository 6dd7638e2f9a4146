//! # FieldSync Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the queue store, the remote
//!   service and the platform connectivity source
//! - The network monitor and its quality classification
//! - The sync coordinator that drains the queue
//!
//! ## Architecture Principles
//! - Only depends on `fieldsync-common` and `fieldsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod network;
pub mod queue;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use network::ports::ConnectivityProbe;
pub use network::{classify, NetworkMonitor, Subscription};
pub use queue::ports::QueueStore;
pub use sync::ports::{
    AutoSyncTarget, CreateRecordRequest, MediaUploadRequest, MediaUploader, RecordClient,
};
pub use sync::{RecoveryReport, SyncCoordinator, SyncCoordinatorConfig};
