//! In-memory `QueueStore`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use fieldsync_common::{Clock, MockClock};
use fieldsync_core::QueueStore;
use fieldsync_domain::{
    FailureUpdate, FieldSyncError, NewRecord, PendingRecord, QueueStats, RecordStatus, Result,
};
use parking_lot::Mutex;

pub struct InMemoryQueueStore {
    records: Mutex<Vec<PendingRecord>>,
    last_sync_at: Mutex<Option<i64>>,
    clock: MockClock,
    fail_media_marks: AtomicBool,
    fail_synced_writes: AtomicBool,
}

impl InMemoryQueueStore {
    pub fn new(clock: MockClock) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            last_sync_at: Mutex::new(None),
            clock,
            fail_media_marks: AtomicBool::new(false),
            fail_synced_writes: AtomicBool::new(false),
        }
    }

    /// Make `mark_media_uploaded` fail until switched back.
    pub fn fail_media_marks(&self, fail: bool) {
        self.fail_media_marks.store(fail, Ordering::SeqCst);
    }

    /// Make `update_status(.., Synced, ..)` fail until switched back.
    pub fn fail_synced_writes(&self, fail: bool) {
        self.fail_synced_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert a record as-is, bypassing the lifecycle checks.
    pub fn insert_raw(&self, record: PendingRecord) {
        self.records.lock().push(record);
    }

    pub fn snapshot(&self, id: &str) -> Option<PendingRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    fn with_record<T>(&self, id: &str, f: impl FnOnce(&mut PendingRecord) -> Result<T>) -> Result<T> {
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| FieldSyncError::NotFound(format!("record {id}")))?;
        let mut working = record.clone();
        let out = f(&mut working)?;
        *record = working;
        Ok(out)
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn enqueue(&self, record: NewRecord) -> Result<String> {
        let record = PendingRecord::from_new(record, self.clock.now_millis());
        let id = record.id.clone();
        self.records.lock().push(record);
        Ok(id)
    }

    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<PendingRecord>> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<PendingRecord>> {
        Ok(self.snapshot(id))
    }

    async fn update_status(
        &self,
        id: &str,
        status: RecordStatus,
        error: Option<&str>,
    ) -> Result<PendingRecord> {
        if status == RecordStatus::Synced && self.fail_synced_writes.load(Ordering::SeqCst) {
            return Err(FieldSyncError::Database("disk I/O error".into()));
        }
        let now = self.clock.now_millis();
        self.with_record(id, |record| {
            if status == RecordStatus::Failed {
                let failure = FailureUpdate::new(
                    record.last_error_kind.unwrap_or(fieldsync_domain::SyncErrorKind::UploadFailed),
                    error.unwrap_or("failed"),
                );
                record.apply_failure(&failure, now)?;
            } else {
                record.set_status(status, now)?;
                if let Some(error) = error {
                    record.last_error = Some(error.to_string());
                }
            }
            Ok(record.clone())
        })
    }

    async fn record_failure(&self, id: &str, failure: &FailureUpdate) -> Result<PendingRecord> {
        let now = self.clock.now_millis();
        self.with_record(id, |record| {
            record.apply_failure(failure, now)?;
            Ok(record.clone())
        })
    }

    async fn mark_media_uploaded(
        &self,
        record_id: &str,
        attachment_id: &str,
        remote_ref: &str,
    ) -> Result<()> {
        if self.fail_media_marks.load(Ordering::SeqCst) {
            return Err(FieldSyncError::Database("disk full".into()));
        }
        self.with_record(record_id, |record| {
            let attachment = record
                .media
                .iter_mut()
                .find(|m| m.id == attachment_id)
                .ok_or_else(|| FieldSyncError::NotFound(format!("attachment {attachment_id}")))?;
            attachment.mark_uploaded(remote_ref)
        })
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }

    async fn reset_retry(&self, id: &str) -> Result<PendingRecord> {
        let now = self.clock.now_millis();
        self.with_record(id, |record| {
            if record.status == RecordStatus::Syncing {
                return Err(FieldSyncError::InvalidTransition {
                    id: id.to_string(),
                    from: record.status,
                    to: RecordStatus::Pending,
                });
            }
            if record.status != RecordStatus::Pending {
                record.set_status(RecordStatus::Pending, now)?;
            }
            record.retry_count = 0;
            record.last_error = None;
            record.last_error_kind = None;
            record.next_attempt_at = None;
            Ok(record.clone())
        })
    }

    async fn reset_for_retry(&self, id: &str, clear_deferral: bool) -> Result<PendingRecord> {
        let now = self.clock.now_millis();
        self.with_record(id, |record| {
            if record.status != RecordStatus::Failed {
                return Err(FieldSyncError::InvalidTransition {
                    id: id.to_string(),
                    from: record.status,
                    to: RecordStatus::Pending,
                });
            }
            record.set_status(RecordStatus::Pending, now)?;
            if clear_deferral {
                record.next_attempt_at = None;
            }
            Ok(record.clone())
        })
    }

    async fn counts(&self) -> Result<QueueStats> {
        let records = self.records.lock();
        let count = |status| records.iter().filter(|r| r.status == status).count();
        Ok(QueueStats {
            pending: count(RecordStatus::Pending),
            syncing: count(RecordStatus::Syncing),
            failed: count(RecordStatus::Failed),
        })
    }

    async fn recover_interrupted(&self) -> Result<usize> {
        let mut records = self.records.lock();
        let mut moved = 0;
        for record in records.iter_mut().filter(|r| r.status == RecordStatus::Syncing) {
            record.status = RecordStatus::Pending;
            moved += 1;
        }
        Ok(moved)
    }

    async fn purge_synced(&self) -> Result<usize> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.status != RecordStatus::Synced);
        Ok(before - records.len())
    }

    async fn set_last_sync_at(&self, at: i64) -> Result<()> {
        *self.last_sync_at.lock() = Some(at);
        Ok(())
    }

    async fn last_sync_at(&self) -> Result<Option<i64>> {
        Ok(*self.last_sync_at.lock())
    }
}
