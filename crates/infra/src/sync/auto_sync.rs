//! Auto-sync trigger
//!
//! Watches the network monitor, an external foreground signal and an
//! optional periodic interval, and calls [`AutoSyncTarget::auto_sync`] once
//! the shared debounce deadline passes. Every connectivity or foreground
//! trigger pushes the deadline out; an interval tick only arms it when no
//! deadline is pending, so a short interval cannot starve the debounce.
//!
//! The worker follows an explicit lifecycle: the join handle is tracked,
//! cancellation goes through a [`CancellationToken`], and `stop` waits with
//! a timeout.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use fieldsync_core::{AutoSyncTarget, NetworkMonitor};
use fieldsync_domain::{FieldSyncError, NetworkStatus, Result, SyncConfig};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Configuration for the auto-sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSyncTriggerConfig {
    /// Quiet period after the last trigger before syncing
    pub debounce: Duration,
    /// Periodic trigger while the link is usable
    pub interval: Option<Duration>,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for AutoSyncTriggerConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for AutoSyncTriggerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.auto_sync_debounce_ms),
            interval: config.auto_sync_interval_secs.filter(|s| *s > 0).map(Duration::from_secs),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Why the debounce deadline was armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Connectivity,
    Foreground,
    Interval,
}

/// Background worker that turns platform signals into automatic syncs.
pub struct AutoSyncTrigger {
    target: Arc<dyn AutoSyncTarget>,
    network: Arc<NetworkMonitor>,
    config: AutoSyncTriggerConfig,
    foreground: Arc<Notify>,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl AutoSyncTrigger {
    pub fn new(
        target: Arc<dyn AutoSyncTarget>,
        network: Arc<NetworkMonitor>,
        config: AutoSyncTriggerConfig,
    ) -> Self {
        Self {
            target,
            network,
            config,
            foreground: Arc::new(Notify::new()),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Start the worker, spawning the background task.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(FieldSyncError::Internal("auto-sync trigger already running".into()));
        }

        self.cancellation = CancellationToken::new();

        let worker = Worker {
            target: Arc::clone(&self.target),
            status_rx: self.network.watch(),
            foreground: Arc::clone(&self.foreground),
            debounce: self.config.debounce,
            interval: self.config.interval,
            cancel: self.cancellation.clone(),
        };

        self.task_handle = Some(tokio::spawn(worker.run()));
        info!(
            debounce_ms = self.config.debounce.as_millis() as u64,
            interval_secs = self.config.interval.map(|i| i.as_secs()),
            "auto-sync trigger started"
        );
        Ok(())
    }

    /// Stop the worker and wait for the task to finish.
    ///
    /// A sync already in flight is allowed to complete within the join
    /// timeout.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(FieldSyncError::Internal("auto-sync trigger not running".into()));
        };

        self.cancellation.cancel();

        match tokio::time::timeout(self.config.join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "auto-sync task panicked");
                return Err(FieldSyncError::Internal("auto-sync task panicked".into()));
            }
            Err(_) => {
                warn!("auto-sync task did not complete within timeout");
                return Err(FieldSyncError::Internal("auto-sync task timeout".into()));
            }
        }

        info!("auto-sync trigger stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Signal that the host app came to the foreground.
    ///
    /// Signals sent while a sync is running are kept and handled after it.
    pub fn notify_foreground(&self) {
        debug!("foreground signal received");
        self.foreground.notify_one();
    }
}

impl Drop for AutoSyncTrigger {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("AutoSyncTrigger dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}

struct Worker {
    target: Arc<dyn AutoSyncTarget>,
    status_rx: watch::Receiver<NetworkStatus>,
    foreground: Arc<Notify>,
    debounce: Duration,
    interval: Option<Duration>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        let mut usable = self.status_rx.borrow_and_update().is_usable();
        let mut deadline: Option<Instant> = None;
        let mut ticker = self.interval.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            let trigger = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("auto-sync loop cancelled");
                    break;
                }
                changed = self.status_rx.changed() => {
                    if changed.is_err() {
                        debug!("network monitor dropped; stopping auto-sync loop");
                        break;
                    }
                    let now_usable = self.status_rx.borrow_and_update().is_usable();
                    let restored = now_usable && !usable;
                    usable = now_usable;
                    restored.then_some(Trigger::Connectivity)
                }
                _ = self.foreground.notified() => Some(Trigger::Foreground),
                _ = next_tick(&mut ticker) => usable.then_some(Trigger::Interval),
                _ = sleep_until(deadline) => {
                    deadline = None;
                    self.sync_now().await;
                    None
                }
            };

            match trigger {
                Some(Trigger::Interval) if deadline.is_some() => {}
                Some(trigger) => {
                    debug!(?trigger, debounce_ms = self.debounce.as_millis() as u64, "auto-sync armed");
                    deadline = Some(Instant::now() + self.debounce);
                }
                None => {}
            }
        }
    }

    async fn sync_now(&self) {
        let result = self.target.auto_sync().await;
        info!(
            attempted = result.attempted,
            synced = result.synced_count,
            failed = result.failed_count,
            deferred = result.deferred,
            errors = result.errors.len(),
            "automatic sync finished"
        );
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => pending::<()>().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use fieldsync_domain::{ConnectionType, ConnectivitySnapshot, SyncResult};

    use super::*;
    use crate::platform::SharedConnectivityProbe;

    #[derive(Default)]
    struct CountingTarget {
        calls: AtomicUsize,
    }

    impl CountingTarget {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AutoSyncTarget for CountingTarget {
        async fn auto_sync(&self) -> SyncResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SyncResult::default()
        }
    }

    struct Fixture {
        target: Arc<CountingTarget>,
        monitor: Arc<NetworkMonitor>,
        trigger: AutoSyncTrigger,
    }

    fn fixture(initial: ConnectivitySnapshot, interval: Option<Duration>) -> Fixture {
        let probe = Arc::new(SharedConnectivityProbe::new(initial));
        let monitor = Arc::new(NetworkMonitor::new(probe));
        let target = Arc::new(CountingTarget::default());
        let config = AutoSyncTriggerConfig {
            debounce: Duration::from_millis(2_000),
            interval,
            join_timeout: Duration::from_secs(1),
        };
        let trigger = AutoSyncTrigger::new(target.clone(), monitor.clone(), config);
        Fixture { target, monitor, trigger }
    }

    fn online() -> ConnectivitySnapshot {
        ConnectivitySnapshot::online(ConnectionType::Wifi)
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn connectivity_restored_syncs_after_debounce() {
        let mut f = fixture(ConnectivitySnapshot::offline(), None);
        f.trigger.start().unwrap();
        settle(10).await;

        f.monitor.handle_snapshot(&online());
        settle(1_900).await;
        assert_eq!(f.target.calls(), 0);

        settle(200).await;
        assert_eq!(f.target.calls(), 1);

        settle(10_000).await;
        assert_eq!(f.target.calls(), 1);
        f.trigger.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_triggers_push_the_deadline_out() {
        let mut f = fixture(online(), None);
        f.trigger.start().unwrap();
        settle(10).await;

        for _ in 0..3 {
            f.trigger.notify_foreground();
            settle(1_500).await;
        }
        assert_eq!(f.target.calls(), 0);

        settle(600).await;
        assert_eq!(f.target.calls(), 1);
        f.trigger.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn staying_connected_does_not_retrigger() {
        let mut f = fixture(online(), None);
        f.trigger.start().unwrap();
        settle(10).await;

        f.monitor.handle_snapshot(&online().with_link(0.5, 900));
        settle(5_000).await;
        assert_eq!(f.target.calls(), 0);
        f.trigger.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_fires_only_while_usable() {
        let mut f = fixture(online(), Some(Duration::from_secs(30)));
        f.trigger.start().unwrap();

        settle(32_500).await;
        assert_eq!(f.target.calls(), 1);

        f.monitor.handle_snapshot(&ConnectivitySnapshot::offline());
        settle(60_000).await;
        assert_eq!(f.target.calls(), 1);
        f.trigger.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_guards_double_start_and_stop() {
        let mut f = fixture(online(), None);
        assert!(f.trigger.stop().await.is_err());

        f.trigger.start().unwrap();
        assert!(f.trigger.is_running());
        assert!(f.trigger.start().is_err());

        f.trigger.stop().await.unwrap();
        assert!(!f.trigger.is_running());

        f.trigger.start().expect("restart after stop");
        f.trigger.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_deadline_skips_the_sync() {
        let mut f = fixture(online(), None);
        f.trigger.start().unwrap();
        f.trigger.notify_foreground();
        settle(500).await;

        f.trigger.stop().await.unwrap();
        settle(5_000).await;
        assert_eq!(f.target.calls(), 0);
    }

    #[test]
    fn zero_interval_is_disabled() {
        let sync = SyncConfig { auto_sync_interval_secs: Some(0), ..SyncConfig::default() };
        let config = AutoSyncTriggerConfig::from(&sync);
        assert_eq!(config.interval, None);
        assert_eq!(config.debounce, Duration::from_millis(2_000));
    }
}
