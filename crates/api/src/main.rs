//! FieldSync agent
//!
//! Runs the sync engine headless: loads `.env` and configuration, starts
//! the auto-sync trigger and waits for Ctrl-C.

use anyhow::Context;
use fieldsync_api::AppContext;
use fieldsync_infra::{config, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads .env itself so FIELDSYNC_* overrides apply.
    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise tracing")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fieldsync agent starting");

    let ctx = AppContext::new_with_config(config)
        .await
        .context("failed to build application context")?;

    let stats = ctx.coordinator.queue_stats().await.context("failed to read queue")?;
    tracing::info!(
        pending = stats.pending,
        failed = stats.failed,
        auto_sync = ctx.auto_sync_running().await,
        "fieldsync agent running; press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    tracing::info!("shutdown requested");

    ctx.shutdown().await.context("shutdown failed")?;
    tracing::info!("fieldsync agent stopped");
    Ok(())
}
