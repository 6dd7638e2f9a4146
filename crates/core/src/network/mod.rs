//! Connectivity observation and link-quality classification

pub mod classify;
pub mod monitor;
pub mod ports;

pub use classify::classify;
pub use monitor::{NetworkMonitor, Subscription};
