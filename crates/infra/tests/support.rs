#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use fieldsync_common::{Clock, SystemClock};
use fieldsync_core::{NetworkMonitor, SyncCoordinator, SyncCoordinatorConfig};
use fieldsync_domain::{ConnectionType, ConnectivitySnapshot, RemoteConfig};
use fieldsync_infra::{DbManager, RemoteApiClient, SharedConnectivityProbe, SqliteQueueStore};
use tempfile::TempDir;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let path = temp_dir.path().join("queue.db");

        let manager = DbManager::new(&path, 4).expect("db manager should be created");
        manager.run_migrations().expect("migrations should run");

        Self { manager: Arc::new(manager), path, _temp_dir: temp_dir }
    }

    /// Open a second manager on the same file, as a restarted process would.
    pub fn reopen(&self) -> Arc<DbManager> {
        let manager = DbManager::new(&self.path, 2).expect("db manager should reopen");
        manager.run_migrations().expect("migrations should be idempotent");
        Arc::new(manager)
    }

    /// Directory for media files that should live as long as the database.
    pub fn dir(&self) -> &std::path::Path {
        self._temp_dir.path()
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Full engine over SQLite and the HTTP client against `base_url`.
pub struct Engine {
    pub db: TestDatabase,
    pub store: Arc<SqliteQueueStore>,
    pub probe: Arc<SharedConnectivityProbe>,
    pub network: Arc<NetworkMonitor>,
    pub coordinator: Arc<SyncCoordinator>,
}

impl Engine {
    pub fn new(base_url: &str) -> Self {
        let db = TestDatabase::new();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(SqliteQueueStore::new(Arc::clone(&db.manager), Arc::clone(&clock)));

        let remote = Arc::new(
            RemoteApiClient::new(&RemoteConfig {
                base_url: base_url.to_string(),
                timeout_secs: 5,
                api_token: Some("test-token".into()),
            })
            .expect("remote client"),
        );

        let probe = Arc::new(SharedConnectivityProbe::new(ConnectivitySnapshot::online(
            ConnectionType::Wifi,
        )));
        let network = Arc::new(NetworkMonitor::new(probe.clone()));

        let config = SyncCoordinatorConfig {
            batch_pause: std::time::Duration::ZERO,
            ..SyncCoordinatorConfig::default()
        };
        let coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            remote.clone(),
            remote,
            Arc::clone(&network),
            clock,
            config,
        ));

        Self { db, store, probe, network, coordinator }
    }

    /// Write a small file to act as a photo on disk.
    pub fn photo(&self, name: &str) -> String {
        let path = self.db.dir().join(name);
        std::fs::write(&path, b"\xFF\xD8fake-jpeg").expect("photo written");
        path.to_string_lossy().into_owned()
    }
}
