//! Network monitor
//!
//! Holds the last known [`NetworkStatus`], recomputes it from the platform
//! probe on demand or when the platform pushes a snapshot, and notifies
//! subscribers only when the derived status actually changes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use fieldsync_domain::{ConnectivitySnapshot, NetworkStatus};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::classify::status_from;
use super::ports::ConnectivityProbe;

type Callback = Arc<dyn Fn(&NetworkStatus) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback)>>,
}

impl Subscribers {
    fn add(&self, callback: Callback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().push((id, callback));
        id
    }

    fn remove(&self, id: u64) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    fn snapshot(&self) -> Vec<Callback> {
        self.callbacks.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    fn len(&self) -> usize {
        self.callbacks.lock().len()
    }
}

/// Handle returned by [`NetworkMonitor::subscribe`].
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.remove(self.id);
        }
    }
}

/// Observes connectivity and classifies link quality.
pub struct NetworkMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    last_known: Mutex<NetworkStatus>,
    subscribers: Arc<Subscribers>,
    watch_tx: watch::Sender<NetworkStatus>,
}

impl NetworkMonitor {
    /// Create a monitor. The initial status is taken from the probe, or
    /// `offline` if the probe fails.
    pub fn new(probe: Arc<dyn ConnectivityProbe>) -> Self {
        let initial = match probe.snapshot() {
            Ok(snapshot) => status_from(&snapshot),
            Err(err) => {
                warn!(error = %err, "initial connectivity probe failed; assuming offline");
                NetworkStatus::offline()
            }
        };
        let (watch_tx, _) = watch::channel(initial);
        Self {
            probe,
            last_known: Mutex::new(initial),
            subscribers: Arc::new(Subscribers::default()),
            watch_tx,
        }
    }

    /// Query the probe and return the derived status.
    ///
    /// Never fails: a probe error yields the last known status.
    pub fn current(&self) -> NetworkStatus {
        match self.probe.snapshot() {
            Ok(snapshot) => self.apply(status_from(&snapshot)),
            Err(err) => {
                let last = *self.last_known.lock();
                warn!(error = %err, quality = %last.quality, "connectivity probe failed; using last known status");
                last
            }
        }
    }

    /// Last known status without touching the probe.
    pub fn last_known(&self) -> NetworkStatus {
        *self.last_known.lock()
    }

    /// Feed a platform connectivity event.
    pub fn handle_snapshot(&self, snapshot: &ConnectivitySnapshot) -> NetworkStatus {
        self.apply(status_from(snapshot))
    }

    /// Register a callback invoked on every meaningful change.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&NetworkStatus) + Send + Sync + 'static,
    {
        let id = self.subscribers.add(Arc::new(callback));
        debug!(subscription_id = id, "network subscriber added");
        Subscription { id, subscribers: Arc::downgrade(&self.subscribers) }
    }

    /// Channel view of the same change stream for async consumers.
    pub fn watch(&self) -> watch::Receiver<NetworkStatus> {
        self.watch_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn apply(&self, next: NetworkStatus) -> NetworkStatus {
        {
            let mut last = self.last_known.lock();
            if *last == next {
                return next;
            }
            *last = next;
        }

        info!(
            connected = next.connected,
            reachable = ?next.reachable,
            quality = %next.quality,
            connection_type = ?next.connection_type,
            "network status changed"
        );
        self.watch_tx.send_replace(next);

        for callback in self.subscribers.snapshot() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(&next)));
            if outcome.is_err() {
                error!("network status subscriber panicked");
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use fieldsync_domain::{ConnectionType, FieldSyncError, NetworkQuality, Result};

    use super::*;

    struct ScriptedProbe {
        next: Mutex<Result<ConnectivitySnapshot>>,
    }

    impl ScriptedProbe {
        fn new(snapshot: ConnectivitySnapshot) -> Arc<Self> {
            Arc::new(Self { next: Mutex::new(Ok(snapshot)) })
        }

        fn set(&self, next: Result<ConnectivitySnapshot>) {
            *self.next.lock() = next;
        }
    }

    impl ConnectivityProbe for ScriptedProbe {
        fn snapshot(&self) -> Result<ConnectivitySnapshot> {
            self.next.lock().clone()
        }
    }

    #[test]
    fn duplicate_events_are_suppressed() {
        let probe = ScriptedProbe::new(ConnectivitySnapshot::offline());
        let monitor = NetworkMonitor::new(probe);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let _sub = monitor.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let wifi = ConnectivitySnapshot::online(ConnectionType::Wifi);
        monitor.handle_snapshot(&wifi);
        monitor.handle_snapshot(&wifi);
        monitor.handle_snapshot(&ConnectivitySnapshot::offline());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn probe_failure_returns_last_known() {
        let probe = ScriptedProbe::new(ConnectivitySnapshot::online(ConnectionType::Ethernet));
        let monitor = NetworkMonitor::new(Arc::clone(&probe) as Arc<dyn ConnectivityProbe>);
        assert_eq!(monitor.current().quality, NetworkQuality::Excellent);

        probe.set(Err(FieldSyncError::Platform("radio off".into())));
        let status = monitor.current();
        assert_eq!(status.quality, NetworkQuality::Excellent);
        assert!(status.is_usable());
    }

    #[test]
    fn failing_initial_probe_starts_offline() {
        let probe = ScriptedProbe::new(ConnectivitySnapshot::offline());
        probe.set(Err(FieldSyncError::Platform("no permission".into())));
        let monitor = NetworkMonitor::new(probe);
        assert_eq!(monitor.last_known(), NetworkStatus::offline());
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let monitor = NetworkMonitor::new(ScriptedProbe::new(ConnectivitySnapshot::offline()));
        let sub = monitor.subscribe(|_| {});
        let other = monitor.subscribe(|_| {});
        assert_eq!(monitor.subscriber_count(), 2);
        sub.unsubscribe();
        assert_eq!(monitor.subscriber_count(), 1);
        drop(other);
        assert_eq!(monitor.subscriber_count(), 0);
    }

    #[test]
    fn panicking_subscriber_does_not_poison_others() {
        let monitor = NetworkMonitor::new(ScriptedProbe::new(ConnectivitySnapshot::offline()));
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let _bad = monitor.subscribe(|_| panic!("subscriber bug"));
        let _good = monitor.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        monitor.handle_snapshot(&ConnectivitySnapshot::online(ConnectionType::Wifi));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn watch_receivers_see_changes() {
        let monitor = NetworkMonitor::new(ScriptedProbe::new(ConnectivitySnapshot::offline()));
        let mut rx = monitor.watch();
        monitor.handle_snapshot(&ConnectivitySnapshot::online(ConnectionType::Wifi));
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_usable());
    }
}
