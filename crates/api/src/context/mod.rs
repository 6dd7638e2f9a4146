//! Application context - dependency injection container

use std::sync::Arc;

use fieldsync_common::{Clock, SystemClock};
use fieldsync_core::{
    AutoSyncTarget, NetworkMonitor, RecoveryReport, SyncCoordinator, SyncCoordinatorConfig,
};
use fieldsync_domain::{Config, ConnectivitySnapshot, Result};
use fieldsync_infra::{
    config, AutoSyncTrigger, AutoSyncTriggerConfig, DbManager, RemoteApiClient,
    SharedConnectivityProbe, SqliteQueueStore,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub queue: Arc<SqliteQueueStore>,
    pub remote: Arc<RemoteApiClient>,
    pub probe: Arc<SharedConnectivityProbe>,
    pub network: Arc<NetworkMonitor>,
    pub coordinator: Arc<SyncCoordinator>,
    auto_sync: Mutex<AutoSyncTrigger>,
}

impl AppContext {
    /// Load configuration from the environment and files, then build.
    pub async fn new() -> Result<Self> {
        let config = config::load()?;
        Self::new_with_config(config).await
    }

    /// Build every service, repair interrupted state and start the
    /// auto-sync trigger when enabled.
    ///
    /// Connectivity starts offline until the host reports a snapshot.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        config::validate(&config)?;

        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let queue = Arc::new(SqliteQueueStore::new(Arc::clone(&db), Arc::clone(&clock)));
        let remote = Arc::new(RemoteApiClient::new(&config.remote)?);

        let probe = Arc::new(SharedConnectivityProbe::new(ConnectivitySnapshot::offline()));
        let network = Arc::new(NetworkMonitor::new(probe.clone()));

        let coordinator = Arc::new(SyncCoordinator::new(
            queue.clone(),
            remote.clone(),
            remote.clone(),
            Arc::clone(&network),
            clock,
            SyncCoordinatorConfig::from(&config.sync),
        ));

        let report = coordinator.recover().await?;
        info!(requeued = report.requeued, purged = report.purged, "queue recovered");

        let target: Arc<dyn AutoSyncTarget> = coordinator.clone();
        let mut trigger = AutoSyncTrigger::new(
            target,
            Arc::clone(&network),
            AutoSyncTriggerConfig::from(&config.sync),
        );
        if config.sync.auto_sync_enabled {
            trigger.start()?;
        } else {
            info!("auto-sync disabled by configuration");
        }

        info!(db_path = %config.database.path, "application context ready");

        Ok(Self {
            config,
            db,
            queue,
            remote,
            probe,
            network,
            coordinator,
            auto_sync: Mutex::new(trigger),
        })
    }

    /// Forward a foreground signal to the auto-sync trigger.
    pub async fn notify_foreground(&self) -> bool {
        let trigger = self.auto_sync.lock().await;
        if trigger.is_running() {
            trigger.notify_foreground();
        }
        trigger.is_running()
    }

    pub async fn auto_sync_running(&self) -> bool {
        self.auto_sync.lock().await.is_running()
    }

    /// Re-run crash recovery on demand.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        self.coordinator.recover().await
    }

    /// Stop background work and ask a running drain to wind down.
    pub async fn shutdown(&self) -> Result<()> {
        if self.coordinator.cancel() {
            info!("cancelling in-flight drain for shutdown");
        }

        let mut trigger = self.auto_sync.lock().await;
        if trigger.is_running() {
            if let Err(err) = trigger.stop().await {
                warn!(error = %err, "auto-sync trigger did not stop cleanly");
                return Err(err);
            }
        }
        info!("application context shut down");
        Ok(())
    }
}
