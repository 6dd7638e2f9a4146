//! Drain progress and outcome types

use serde::{Deserialize, Serialize};

use crate::errors::SyncErrorKind;

/// Step of an item pipeline reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    UploadingMedia,
    MediaUploaded,
    CreatingRecord,
    RecordCreated,
    Failed,
}

crate::impl_domain_status_conversions!(SyncPhase {
    UploadingMedia => "uploading_media",
    MediaUploaded => "media_uploaded",
    CreatingRecord => "creating_record",
    RecordCreated => "record_created",
    Failed => "failed",
});

/// Progress event published while a drain runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    /// Items selected for this drain.
    pub total: usize,
    /// 1-based position of `current_id` within the drain.
    pub current: usize,
    pub current_id: String,
    pub phase: SyncPhase,
}

/// One per-item (or drain-level) failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItemError {
    /// `None` for drain-level errors such as a missing network.
    pub record_id: Option<String>,
    pub kind: SyncErrorKind,
    pub message: String,
}

impl SyncItemError {
    pub fn for_record(record_id: impl Into<String>, kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self { record_id: Some(record_id.into()), kind, message: message.into() }
    }

    pub fn drain_level(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self { record_id: None, kind, message: message.into() }
    }
}

/// Aggregate outcome of one drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub attempted: usize,
    pub synced_count: usize,
    pub failed_count: usize,
    /// Pending records skipped because their backoff window is still open.
    pub deferred: usize,
    pub cancelled: bool,
    pub errors: Vec<SyncItemError>,
}

impl SyncResult {
    pub fn network_unavailable() -> Self {
        Self {
            errors: vec![SyncItemError::drain_level(
                SyncErrorKind::NetworkUnavailable,
                "network unavailable",
            )],
            ..Self::default()
        }
    }

    pub fn already_running() -> Self {
        Self {
            errors: vec![SyncItemError::drain_level(
                SyncErrorKind::SyncInProgress,
                "a sync is already running",
            )],
            ..Self::default()
        }
    }

    /// True when the drain was refused before touching any item.
    pub fn was_refused(&self) -> bool {
        self.attempted == 0
            && self.errors.iter().any(|e| {
                e.record_id.is_none()
                    && matches!(e.kind, SyncErrorKind::NetworkUnavailable | SyncErrorKind::SyncInProgress)
            })
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Queue size by status, published whenever the queue changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub syncing: usize,
    pub failed: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.pending + self.syncing + self.failed
    }
}
