//! Platform adapters
//!
//! The host application (mobile shell, desktop agent) owns the real
//! connectivity APIs. It pushes snapshots into a
//! [`SharedConnectivityProbe`], which the network monitor then reads.

pub mod connectivity;

pub use connectivity::SharedConnectivityProbe;
