//! Connectivity probe fed by host platform events

use fieldsync_core::ConnectivityProbe;
use fieldsync_domain::{ConnectivitySnapshot, Result};
use parking_lot::Mutex;
use tracing::debug;

/// Holds the latest snapshot reported by the platform.
///
/// Starts offline until the host reports otherwise.
#[derive(Debug)]
pub struct SharedConnectivityProbe {
    latest: Mutex<ConnectivitySnapshot>,
}

impl SharedConnectivityProbe {
    pub fn new(initial: ConnectivitySnapshot) -> Self {
        Self { latest: Mutex::new(initial) }
    }

    /// Replace the stored snapshot.
    pub fn set(&self, snapshot: ConnectivitySnapshot) {
        debug!(
            connected = snapshot.connected,
            reachable = ?snapshot.reachable,
            connection_type = ?snapshot.connection_type,
            "connectivity snapshot updated"
        );
        *self.latest.lock() = snapshot;
    }

    /// Modify the stored snapshot in place and return the result.
    pub fn update<F>(&self, apply: F) -> ConnectivitySnapshot
    where
        F: FnOnce(&mut ConnectivitySnapshot),
    {
        let mut latest = self.latest.lock();
        apply(&mut latest);
        *latest
    }

    pub fn latest(&self) -> ConnectivitySnapshot {
        *self.latest.lock()
    }
}

impl Default for SharedConnectivityProbe {
    fn default() -> Self {
        Self::new(ConnectivitySnapshot::offline())
    }
}

impl ConnectivityProbe for SharedConnectivityProbe {
    fn snapshot(&self) -> Result<ConnectivitySnapshot> {
        Ok(self.latest())
    }
}
