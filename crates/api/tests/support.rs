#![allow(dead_code)]

use fieldsync_api::AppContext;
use fieldsync_domain::Config;
use tempfile::TempDir;

/// Build a context over a temporary database pointing at `base_url`.
///
/// Returns the temp dir too so the database outlives the test body.
pub async fn test_context(base_url: &str, auto_sync: bool) -> (AppContext, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temporary test directory");
    let mut config = Config::default();
    config.database.path = temp_dir.path().join("fieldsync.db").to_string_lossy().into_owned();
    config.remote.base_url = base_url.to_string();
    config.sync.auto_sync_enabled = auto_sync;
    config.sync.batch_pause_ms = 0;
    config.sync.auto_sync_debounce_ms = 200;

    let ctx = AppContext::new_with_config(config).await.expect("context builds");
    (ctx, temp_dir)
}
