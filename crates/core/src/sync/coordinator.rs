//! Sync coordinator - drains the durable queue against the remote service
//!
//! A drain takes the pending records in queue order, splits them into
//! batches of `batch_size`, and runs each batch's item pipelines
//! concurrently. Batches run one after another. Each pipeline uploads the
//! record's outstanding media, then creates the remote record, then removes
//! the local copy. Failures are written back to the record and never escape
//! a drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_common::{Clock, ExponentialBackoff};
use fieldsync_domain::constants::PROGRESS_CHANNEL_CAPACITY;
use fieldsync_domain::{
    FailureUpdate, FieldSyncError, NetworkQuality, NewRecord, PendingRecord, QueueStats,
    RecordStatus, RejectionPolicy, RemoteError, RemoteMediaRef, Result, SyncConfig,
    SyncErrorKind, SyncItemError, SyncPhase, SyncProgress, SyncResult,
};
use futures::future::join_all;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};

use super::ports::{
    AutoSyncTarget, CreateRecordRequest, MediaUploadRequest, MediaUploader, RecordClient,
};
use crate::network::NetworkMonitor;
use crate::queue::ports::QueueStore;

/// Tuning for [`SyncCoordinator`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncCoordinatorConfig {
    pub batch_size: usize,
    pub max_retry_attempts: u32,
    pub backoff: ExponentialBackoff,
    pub batch_pause: Duration,
    pub rejection_policy: RejectionPolicy,
}

impl Default for SyncCoordinatorConfig {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for SyncCoordinatorConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            max_retry_attempts: config.max_retry_attempts,
            backoff: ExponentialBackoff::from_millis(
                config.base_delay_ms,
                config.backoff_multiplier,
                config.max_delay_ms,
            ),
            batch_pause: Duration::from_millis(config.batch_pause_ms),
            rejection_policy: config.rejection_policy,
        }
    }
}

/// Outcome of startup recovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records moved from `syncing` back to `pending`.
    pub requeued: usize,
    /// Leftover `synced` rows deleted.
    pub purged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DrainScope {
    AllPending,
    Single(String),
}

#[derive(Debug)]
enum ItemOutcome {
    Synced,
    Failed(SyncItemError),
    Skipped,
}

enum PushError {
    Remote(RemoteError),
    Local(FieldSyncError),
}

/// Resets the single-flight flag when the drain ends, including on panic.
struct SingleFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SingleFlightGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SingleFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Orchestrates draining the queue.
pub struct SyncCoordinator {
    queue: Arc<dyn QueueStore>,
    uploader: Arc<dyn MediaUploader>,
    records: Arc<dyn RecordClient>,
    network: Arc<NetworkMonitor>,
    clock: Arc<dyn Clock>,
    config: SyncCoordinatorConfig,
    syncing: AtomicBool,
    cancel_requested: AtomicBool,
    progress_tx: broadcast::Sender<SyncProgress>,
    queue_tx: watch::Sender<QueueStats>,
}

impl SyncCoordinator {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        uploader: Arc<dyn MediaUploader>,
        records: Arc<dyn RecordClient>,
        network: Arc<NetworkMonitor>,
        clock: Arc<dyn Clock>,
        config: SyncCoordinatorConfig,
    ) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        let (queue_tx, _) = watch::channel(QueueStats::default());
        Self {
            queue,
            uploader,
            records,
            network,
            clock,
            config,
            syncing: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            progress_tx,
            queue_tx,
        }
    }

    pub fn config(&self) -> &SyncCoordinatorConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<NetworkMonitor> {
        &self.network
    }

    /// Add a record to the queue.
    #[instrument(skip(self, record), fields(media = record.media.len(), priority = record.priority))]
    pub async fn enqueue(&self, record: NewRecord) -> Result<String> {
        record.validate()?;
        let id = self.queue.enqueue(record).await?;
        info!(record_id = %id, "record enqueued");
        self.publish_queue_stats().await;
        Ok(id)
    }

    /// Drain every eligible pending record. Manual drains ignore link quality.
    pub async fn drain(&self) -> SyncResult {
        self.run(DrainScope::AllPending).await
    }

    /// Like [`Self::drain`], but refuses on a poor link.
    pub async fn auto_sync(&self) -> SyncResult {
        let status = self.network.current();
        if status.quality == NetworkQuality::Poor {
            info!("skipping automatic sync on a poor link");
            return SyncResult {
                errors: vec![SyncItemError::drain_level(
                    SyncErrorKind::NetworkUnavailable,
                    "link quality too poor for automatic sync",
                )],
                ..SyncResult::default()
            };
        }
        self.run(DrainScope::AllPending).await
    }

    /// Put one failed record back in the queue and drain just that record.
    ///
    /// The record's backoff window is cleared; counters are kept.
    #[instrument(skip(self))]
    pub async fn retry_one(&self, id: &str) -> Result<SyncResult> {
        let record = self
            .queue
            .get(id)
            .await?
            .ok_or_else(|| FieldSyncError::NotFound(format!("record {id}")))?;
        if record.status != RecordStatus::Failed {
            return Err(FieldSyncError::InvalidTransition {
                id: id.to_string(),
                from: record.status,
                to: RecordStatus::Pending,
            });
        }
        self.queue.reset_for_retry(id, true).await?;
        self.publish_queue_stats().await;
        Ok(self.run(DrainScope::Single(id.to_string())).await)
    }

    /// Put every failed record back in the queue, then drain.
    ///
    /// Backoff windows are kept, so records still inside theirs are reported
    /// as deferred and picked up by a later drain.
    #[instrument(skip(self))]
    pub async fn retry_all_failed(&self) -> Result<SyncResult> {
        let failed = self.queue.list(Some(RecordStatus::Failed)).await?;
        for record in &failed {
            self.queue.reset_for_retry(&record.id, false).await?;
        }
        info!(count = failed.len(), "failed records returned to the queue");
        self.publish_queue_stats().await;
        Ok(self.run(DrainScope::AllPending).await)
    }

    /// Operator reset: zero the retry counter and make the record pending.
    ///
    /// Refused while the record is in flight.
    #[instrument(skip(self))]
    pub async fn reset_record(&self, id: &str) -> Result<PendingRecord> {
        let record = self.queue.reset_retry(id).await?;
        self.publish_queue_stats().await;
        Ok(record)
    }

    /// Ask the running drain to stop before its next item.
    ///
    /// Returns whether a drain was running. Requests already sent to the
    /// remote are allowed to finish.
    pub fn cancel(&self) -> bool {
        let running = self.is_syncing();
        if running {
            self.cancel_requested.store(true, Ordering::SeqCst);
            info!("sync cancellation requested");
        }
        running
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Records not yet on the remote and not failed (pending plus in flight).
    pub async fn pending_count(&self) -> Result<usize> {
        let stats = self.queue.counts().await?;
        Ok(stats.pending + stats.syncing)
    }

    pub async fn failed_list(&self) -> Result<Vec<PendingRecord>> {
        self.queue.list(Some(RecordStatus::Failed)).await
    }

    pub async fn last_sync_timestamp(&self) -> Result<Option<i64>> {
        self.queue.last_sync_at().await
    }

    pub async fn queue_stats(&self) -> Result<QueueStats> {
        self.queue.counts().await
    }

    pub fn subscribe_progress(&self) -> broadcast::Receiver<SyncProgress> {
        self.progress_tx.subscribe()
    }

    pub fn subscribe_queue(&self) -> watch::Receiver<QueueStats> {
        self.queue_tx.subscribe()
    }

    /// Repair state left by a crash: requeue interrupted records and drop
    /// leftover synced rows.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let requeued = self.queue.recover_interrupted().await?;
        let purged = self.queue.purge_synced().await?;
        if requeued > 0 || purged > 0 {
            warn!(requeued, purged, "recovered queue state from an interrupted drain");
        }
        self.publish_queue_stats().await;
        Ok(RecoveryReport { requeued, purged })
    }

    async fn run(&self, scope: DrainScope) -> SyncResult {
        let Some(_guard) = SingleFlightGuard::try_acquire(&self.syncing) else {
            debug!(?scope, "drain refused: already running");
            return SyncResult::already_running();
        };
        self.cancel_requested.store(false, Ordering::SeqCst);

        let status = self.network.current();
        if !status.is_usable() {
            info!(connected = status.connected, reachable = ?status.reachable, "drain refused: network unavailable");
            return SyncResult::network_unavailable();
        }

        let mut result = SyncResult::default();
        let candidates = match self.select(&scope).await {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "failed to load pending records");
                result.errors.push(SyncItemError::drain_level(
                    SyncErrorKind::LocalStorageError,
                    err.to_string(),
                ));
                return result;
            }
        };

        let now = self.clock.now_millis();
        let (eligible, deferred): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|record| matches!(scope, DrainScope::Single(_)) || record.is_eligible_at(now));
        result.deferred = deferred.len();

        let total = eligible.len();
        info!(total, deferred = result.deferred, batch_size = self.config.batch_size, "drain started");

        for (batch_index, batch) in eligible.chunks(self.config.batch_size).enumerate() {
            if self.cancel_requested.load(Ordering::SeqCst) {
                result.cancelled = true;
                break;
            }
            if batch_index > 0 && !self.config.batch_pause.is_zero() {
                tokio::time::sleep(self.config.batch_pause).await;
            }

            let offset = batch_index * self.config.batch_size;
            let pipelines = batch
                .iter()
                .enumerate()
                .map(|(i, record)| self.process_item(record, offset + i + 1, total));

            for outcome in join_all(pipelines).await {
                match outcome {
                    ItemOutcome::Synced => {
                        result.attempted += 1;
                        result.synced_count += 1;
                    }
                    ItemOutcome::Failed(item_error) => {
                        result.attempted += 1;
                        result.failed_count += 1;
                        result.errors.push(item_error);
                    }
                    ItemOutcome::Skipped => result.cancelled = true,
                }
            }
            self.publish_queue_stats().await;
        }

        if let Err(err) = self.queue.set_last_sync_at(self.clock.now_millis()).await {
            warn!(error = %err, "failed to persist last sync timestamp");
        }
        self.publish_queue_stats().await;

        info!(
            attempted = result.attempted,
            synced = result.synced_count,
            failed = result.failed_count,
            cancelled = result.cancelled,
            "drain finished"
        );
        result
    }

    async fn select(&self, scope: &DrainScope) -> Result<Vec<PendingRecord>> {
        match scope {
            DrainScope::AllPending => self.queue.list(Some(RecordStatus::Pending)).await,
            DrainScope::Single(id) => Ok(self
                .queue
                .get(id)
                .await?
                .filter(|record| record.status == RecordStatus::Pending)
                .into_iter()
                .collect()),
        }
    }

    #[instrument(skip(self, record, total), fields(record_id = %record.id, retry_count = record.retry_count))]
    async fn process_item(&self, record: &PendingRecord, position: usize, total: usize) -> ItemOutcome {
        if self.cancel_requested.load(Ordering::SeqCst) {
            debug!("item skipped after cancellation");
            return ItemOutcome::Skipped;
        }

        if record.has_exhausted(self.config.max_retry_attempts) {
            let message = format!("exceeded max attempts ({})", self.config.max_retry_attempts);
            let failure = FailureUpdate::new(SyncErrorKind::ExceededRetryLimit, message.clone()).uncounted();
            if let Err(err) = self.queue.record_failure(&record.id, &failure).await {
                return self.local_failure(record, &err);
            }
            self.emit(total, position, &record.id, SyncPhase::Failed);
            return ItemOutcome::Failed(SyncItemError::for_record(
                &record.id,
                SyncErrorKind::ExceededRetryLimit,
                message,
            ));
        }

        if let Err(err) = self.queue.update_status(&record.id, RecordStatus::Syncing, None).await {
            return self.local_failure(record, &err);
        }

        match self.push_record(record, position, total).await {
            Ok(remote_id) => self.complete(record, &remote_id, position, total).await,
            Err(PushError::Remote(err)) => self.fail(record, &err, position, total).await,
            Err(PushError::Local(err)) => {
                if let Err(requeue_err) =
                    self.queue.update_status(&record.id, RecordStatus::Pending, None).await
                {
                    error!(error = %requeue_err, "could not return record to pending");
                }
                self.emit(total, position, &record.id, SyncPhase::Failed);
                self.local_failure(record, &err)
            }
        }
    }

    async fn push_record(
        &self,
        record: &PendingRecord,
        position: usize,
        total: usize,
    ) -> std::result::Result<String, PushError> {
        let mut media_refs = Vec::with_capacity(record.media.len());

        for attachment in &record.media {
            if let Some(existing) = attachment.remote_media_ref() {
                debug!(attachment_id = %attachment.id, "media already uploaded; skipping");
                media_refs.push(existing);
                continue;
            }

            self.emit(total, position, &record.id, SyncPhase::UploadingMedia);
            let request = MediaUploadRequest {
                owner_id: record.id.clone(),
                attachment_id: attachment.id.clone(),
                local_ref: attachment.local_ref.clone(),
                attempt_id: format!("{}:{}", record.idempotency_key, attachment.id),
                size_bytes: attachment.size_bytes,
                mime_type: attachment.mime_type.clone(),
            };
            let remote_ref = self.uploader.upload_media(&request).await.map_err(PushError::Remote)?;
            self.queue
                .mark_media_uploaded(&record.id, &attachment.id, &remote_ref)
                .await
                .map_err(PushError::Local)?;
            self.emit(total, position, &record.id, SyncPhase::MediaUploaded);

            media_refs.push(RemoteMediaRef { attachment_id: attachment.id.clone(), remote_ref });
        }

        self.emit(total, position, &record.id, SyncPhase::CreatingRecord);
        let request = CreateRecordRequest {
            record_id: record.id.clone(),
            idempotency_key: record.idempotency_key.clone(),
            payload: record.payload.clone(),
            media: media_refs,
        };
        self.records.create_record(&request).await.map_err(PushError::Remote)
    }

    async fn complete(
        &self,
        record: &PendingRecord,
        remote_id: &str,
        position: usize,
        total: usize,
    ) -> ItemOutcome {
        self.emit(total, position, &record.id, SyncPhase::RecordCreated);

        // The record stays `syncing` if this write fails; recovery requeues it
        // and the idempotency key lets the remote drop the duplicate create.
        if let Err(err) = self.queue.update_status(&record.id, RecordStatus::Synced, None).await {
            return self.local_failure(record, &err);
        }
        if let Err(err) = self.queue.remove(&record.id).await {
            warn!(error = %err, "synced record not removed; it will be purged on recovery");
        }

        info!(remote_id, "record synced");
        ItemOutcome::Synced
    }

    async fn fail(
        &self,
        record: &PendingRecord,
        err: &RemoteError,
        position: usize,
        total: usize,
    ) -> ItemOutcome {
        let kind = err.kind();
        let message = err.to_string();
        let mut failure = FailureUpdate::new(kind, message.clone());

        if kind == SyncErrorKind::RemoteRejected
            && self.config.rejection_policy == RejectionPolicy::Exhaust
        {
            failure = failure.exhausting(self.config.max_retry_attempts);
        } else {
            let retry_count = record.retry_count.saturating_add(1);
            let delay = self.config.backoff.delay(retry_count);
            let not_before = self
                .clock
                .now_millis()
                .saturating_add(i64::try_from(delay.as_millis()).unwrap_or(i64::MAX));
            failure = failure.retry_not_before(not_before);
        }

        warn!(error = %message, kind = %kind, "sync attempt failed");
        self.emit(total, position, &record.id, SyncPhase::Failed);

        if let Err(store_err) = self.queue.record_failure(&record.id, &failure).await {
            return self.local_failure(record, &store_err);
        }
        ItemOutcome::Failed(SyncItemError::for_record(&record.id, kind, message))
    }

    fn local_failure(&self, record: &PendingRecord, err: &FieldSyncError) -> ItemOutcome {
        error!(record_id = %record.id, error = %err, "local storage error during sync");
        ItemOutcome::Failed(SyncItemError::for_record(
            &record.id,
            SyncErrorKind::LocalStorageError,
            err.to_string(),
        ))
    }

    fn emit(&self, total: usize, current: usize, record_id: &str, phase: SyncPhase) {
        // No receivers is fine.
        let _ = self.progress_tx.send(SyncProgress {
            total,
            current,
            current_id: record_id.to_string(),
            phase,
        });
    }

    async fn publish_queue_stats(&self) {
        match self.queue.counts().await {
            Ok(stats) => {
                self.queue_tx.send_if_modified(|current| {
                    if *current == stats {
                        false
                    } else {
                        *current = stats;
                        true
                    }
                });
            }
            Err(err) => warn!(error = %err, "failed to read queue counts"),
        }
    }
}

#[async_trait]
impl AutoSyncTarget for SyncCoordinator {
    async fn auto_sync(&self) -> SyncResult {
        SyncCoordinator::auto_sync(self).await
    }
}
