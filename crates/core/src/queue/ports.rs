//! Port interfaces for the durable queue

use async_trait::async_trait;
use fieldsync_domain::{FailureUpdate, NewRecord, PendingRecord, QueueStats, RecordStatus, Result};

/// Durable store of pending records and their media.
///
/// Every mutation must be committed before the call returns. Status changes
/// are validated against [`RecordStatus::can_transition_to`].
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Persist a new record as `pending` with `retry_count = 0`; returns its id.
    async fn enqueue(&self, record: NewRecord) -> Result<String>;

    /// Records (with media) ordered by priority desc, then creation asc.
    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<PendingRecord>>;

    async fn get(&self, id: &str) -> Result<Option<PendingRecord>>;

    /// Change status. Entering `failed` increments `retry_count`; `error`,
    /// when given, replaces `last_error`.
    async fn update_status(
        &self,
        id: &str,
        status: RecordStatus,
        error: Option<&str>,
    ) -> Result<PendingRecord>;

    /// Atomic failure transition: status, counters, error and backoff window.
    async fn record_failure(&self, id: &str, failure: &FailureUpdate) -> Result<PendingRecord>;

    /// Set `uploaded` and `remote_ref` for one attachment.
    async fn mark_media_uploaded(
        &self,
        record_id: &str,
        attachment_id: &str,
        remote_ref: &str,
    ) -> Result<()>;

    /// Delete a record and its media. Returns false if it did not exist.
    async fn remove(&self, id: &str) -> Result<bool>;

    /// Operator escape hatch: `retry_count = 0`, status `pending`, error and
    /// backoff window cleared.
    async fn reset_retry(&self, id: &str) -> Result<PendingRecord>;

    /// `failed -> pending`, keeping counters. `clear_deferral` also drops the
    /// backoff window.
    async fn reset_for_retry(&self, id: &str, clear_deferral: bool) -> Result<PendingRecord>;

    async fn counts(&self) -> Result<QueueStats>;

    /// Move records left in `syncing` by an interrupted drain back to `pending`.
    async fn recover_interrupted(&self) -> Result<usize>;

    /// Delete `synced` rows whose removal was interrupted.
    async fn purge_synced(&self) -> Result<usize>;

    /// Persist the time of the latest drain that reached the network.
    async fn set_last_sync_at(&self, at: i64) -> Result<()>;

    async fn last_sync_at(&self) -> Result<Option<i64>>;
}
