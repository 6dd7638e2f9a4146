//! Queue draining against the remote service

pub mod coordinator;
pub mod ports;

pub use coordinator::{RecoveryReport, SyncCoordinator, SyncCoordinatorConfig};
