//! Port interfaces for platform connectivity

use fieldsync_domain::{ConnectivitySnapshot, Result};

/// Point-in-time connectivity facts from the host platform.
pub trait ConnectivityProbe: Send + Sync {
    fn snapshot(&self) -> Result<ConnectivitySnapshot>;
}
