//! Shared test helpers for `fieldsync-core` integration tests.
//!
//! In-memory fakes for every core port so coordinator tests can focus on
//! behaviour instead of storage or HTTP.

#![allow(dead_code)]

pub mod probe;
pub mod queue;
pub mod remote;

use std::sync::Arc;
use std::time::Duration;

use fieldsync_common::{ExponentialBackoff, MockClock};
use fieldsync_core::{NetworkMonitor, SyncCoordinator, SyncCoordinatorConfig};
use fieldsync_domain::{ConnectionType, ConnectivitySnapshot, RejectionPolicy};

pub use probe::SwitchableProbe;
pub use queue::InMemoryQueueStore;
pub use remote::FakeRemote;

/// Everything a coordinator test needs, wired together.
pub struct Harness {
    pub queue: Arc<InMemoryQueueStore>,
    pub remote: Arc<FakeRemote>,
    pub probe: Arc<SwitchableProbe>,
    pub network: Arc<NetworkMonitor>,
    pub clock: MockClock,
    pub coordinator: Arc<SyncCoordinator>,
}

pub fn test_config() -> SyncCoordinatorConfig {
    SyncCoordinatorConfig {
        batch_size: 5,
        max_retry_attempts: 3,
        backoff: ExponentialBackoff::from_millis(1_000, 2.0, 60_000),
        batch_pause: Duration::ZERO,
        rejection_policy: RejectionPolicy::Exhaust,
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SyncCoordinatorConfig) -> Self {
        let clock = MockClock::default();
        let queue = Arc::new(InMemoryQueueStore::new(clock.clone()));
        let remote = Arc::new(FakeRemote::default());
        let probe = Arc::new(SwitchableProbe::new(ConnectivitySnapshot::online(ConnectionType::Wifi)));
        let network = Arc::new(NetworkMonitor::new(probe.clone()));
        let coordinator = Arc::new(SyncCoordinator::new(
            queue.clone(),
            remote.clone(),
            remote.clone(),
            Arc::clone(&network),
            Arc::new(clock.clone()),
            config,
        ));
        Self { queue, remote, probe, network, clock, coordinator }
    }
}
