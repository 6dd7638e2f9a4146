//! Connectivity probe the test can flip.

use fieldsync_core::ConnectivityProbe;
use fieldsync_domain::{ConnectivitySnapshot, FieldSyncError, Result};
use parking_lot::Mutex;

pub struct SwitchableProbe {
    current: Mutex<Option<ConnectivitySnapshot>>,
}

impl SwitchableProbe {
    pub fn new(snapshot: ConnectivitySnapshot) -> Self {
        Self { current: Mutex::new(Some(snapshot)) }
    }

    pub fn set(&self, snapshot: ConnectivitySnapshot) {
        *self.current.lock() = Some(snapshot);
    }

    /// Make the next probes fail.
    pub fn break_probe(&self) {
        *self.current.lock() = None;
    }
}

impl ConnectivityProbe for SwitchableProbe {
    fn snapshot(&self) -> Result<ConnectivitySnapshot> {
        (*self.current.lock()).ok_or_else(|| FieldSyncError::Platform("probe unavailable".into()))
    }
}
