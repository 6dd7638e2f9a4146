//! Queue and sync commands

use fieldsync_domain::{
    NewRecord, PendingRecord, QueueStats, Result as DomainResult, SyncProgress, SyncResult,
};
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::context::AppContext;
use crate::utils::execute_logged;

/// Persist a new record; returns its id.
pub async fn enqueue_record(ctx: &AppContext, record: NewRecord) -> DomainResult<String> {
    execute_logged("sync::enqueue_record", || ctx.coordinator.enqueue(record)).await
}

/// Manual drain. Ignores link quality but still needs a usable network.
pub async fn sync_now(ctx: &AppContext) -> DomainResult<SyncResult> {
    execute_logged("sync::sync_now", || async {
        let result = ctx.coordinator.drain().await;
        info!(
            attempted = result.attempted,
            synced = result.synced_count,
            failed = result.failed_count,
            refused = result.was_refused(),
            "manual sync finished"
        );
        Ok(result)
    })
    .await
}

pub async fn retry_record(ctx: &AppContext, id: &str) -> DomainResult<SyncResult> {
    execute_logged("sync::retry_record", || ctx.coordinator.retry_one(id)).await
}

pub async fn retry_all_failed(ctx: &AppContext) -> DomainResult<SyncResult> {
    execute_logged("sync::retry_all_failed", || ctx.coordinator.retry_all_failed()).await
}

/// Returns whether a drain was running.
pub fn cancel_sync(ctx: &AppContext) -> bool {
    ctx.coordinator.cancel()
}

pub async fn reset_record(ctx: &AppContext, id: &str) -> DomainResult<PendingRecord> {
    execute_logged("sync::reset_record", || ctx.coordinator.reset_record(id)).await
}

pub async fn pending_count(ctx: &AppContext) -> DomainResult<usize> {
    execute_logged("sync::pending_count", || ctx.coordinator.pending_count()).await
}

pub async fn failed_records(ctx: &AppContext) -> DomainResult<Vec<PendingRecord>> {
    execute_logged("sync::failed_records", || ctx.coordinator.failed_list()).await
}

/// Epoch milliseconds of the last drain that passed the network gate.
pub async fn last_sync_timestamp(ctx: &AppContext) -> DomainResult<Option<i64>> {
    execute_logged("sync::last_sync_timestamp", || ctx.coordinator.last_sync_timestamp()).await
}

pub async fn queue_stats(ctx: &AppContext) -> DomainResult<QueueStats> {
    execute_logged("sync::queue_stats", || ctx.coordinator.queue_stats()).await
}

pub fn subscribe_progress(ctx: &AppContext) -> broadcast::Receiver<SyncProgress> {
    ctx.coordinator.subscribe_progress()
}

pub fn subscribe_queue(ctx: &AppContext) -> watch::Receiver<QueueStats> {
    ctx.coordinator.subscribe_queue()
}
