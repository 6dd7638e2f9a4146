//! Queued records and their lifecycle

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::media::{MediaAttachment, NewMediaAttachment};
use crate::errors::{FieldSyncError, Result, SyncErrorKind};
use crate::utils::text::truncate_reason;

/// Lifecycle of a queued record.
///
/// ```text
///   pending ──► syncing ──► synced
///     │  ▲         │
///     │  └─recover─┤
///     ▼            ▼
///   failed ◄───────┘
///     │
///     └──── explicit retry/reset ──► pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Syncing,
    Failed,
    Synced,
}

crate::impl_domain_status_conversions!(RecordStatus {
    Pending => "pending",
    Syncing => "syncing",
    Failed => "failed",
    Synced => "synced",
});

impl RecordStatus {
    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: Self) -> bool {
        use RecordStatus::{Failed, Pending, Synced, Syncing};
        matches!(
            (self, next),
            (Pending, Syncing)
                | (Pending, Failed)
                | (Syncing, Synced)
                | (Syncing, Failed)
                | (Syncing, Pending)
                | (Failed, Pending)
        )
    }

    /// Validate a transition, returning the new status.
    pub fn transition(self, id: &str, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(FieldSyncError::InvalidTransition { id: id.to_string(), from: self, to: next })
        }
    }
}

/// A record waiting in the local queue for remote persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub id: String,
    /// Stable key sent with every create call so the remote can dedupe.
    pub idempotency_key: String,
    pub payload: Value,
    pub media: Vec<MediaAttachment>,
    /// Epoch milliseconds at enqueue.
    pub created_at: i64,
    pub updated_at: i64,
    pub status: RecordStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub last_error_kind: Option<SyncErrorKind>,
    pub priority: i32,
    /// Earliest time an automatic drain may pick the record again.
    pub next_attempt_at: Option<i64>,
}

impl PendingRecord {
    /// Materialise a new queue entry from caller input.
    pub fn from_new(new: NewRecord, now: i64) -> Self {
        let id = Uuid::now_v7().to_string();
        let media = new
            .media
            .into_iter()
            .enumerate()
            .map(|(position, attachment)| {
                MediaAttachment::from_new(attachment, &id, u32::try_from(position).unwrap_or(u32::MAX))
            })
            .collect();

        Self {
            idempotency_key: Uuid::new_v4().to_string(),
            id,
            payload: new.payload,
            media,
            created_at: now,
            updated_at: now,
            status: RecordStatus::Pending,
            retry_count: 0,
            last_error: None,
            last_error_kind: None,
            priority: new.priority,
            next_attempt_at: None,
        }
    }

    pub fn is_eligible_at(&self, now: i64) -> bool {
        self.next_attempt_at.map_or(true, |at| at <= now)
    }

    pub fn has_exhausted(&self, max_attempts: u32) -> bool {
        self.retry_count >= max_attempts
    }

    /// Move to `next`, rejecting edges outside the lifecycle graph.
    pub fn set_status(&mut self, next: RecordStatus, now: i64) -> Result<()> {
        self.status = self.status.transition(&self.id, next)?;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a failure transition in memory.
    ///
    /// Storage backends perform the same update in a single write.
    pub fn apply_failure(&mut self, failure: &FailureUpdate, now: i64) -> Result<()> {
        self.set_status(RecordStatus::Failed, now)?;
        if failure.count_attempt {
            self.retry_count = self.retry_count.saturating_add(1);
        }
        if let Some(floor) = failure.exhaust_to {
            self.retry_count = self.retry_count.max(floor);
        }
        self.last_error = Some(truncate_reason(&failure.message));
        self.last_error_kind = Some(failure.kind);
        self.next_attempt_at = failure.next_attempt_at;
        Ok(())
    }
}

/// Caller input for `enqueue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub payload: Value,
    #[serde(default)]
    pub media: Vec<NewMediaAttachment>,
    #[serde(default)]
    pub priority: i32,
}

impl NewRecord {
    pub fn new(payload: Value) -> Self {
        Self { payload, media: Vec::new(), priority: 0 }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_media(mut self, attachment: NewMediaAttachment) -> Self {
        self.media.push(attachment);
        self
    }

    /// Reject input the queue could never sync.
    pub fn validate(&self) -> Result<()> {
        if self.payload.is_null() {
            return Err(FieldSyncError::InvalidInput("record payload must not be null".into()));
        }
        if let Some(position) = self.media.iter().position(|m| m.local_ref.trim().is_empty()) {
            return Err(FieldSyncError::InvalidInput(format!(
                "media attachment {position} has an empty local reference"
            )));
        }
        Ok(())
    }
}

/// A failure transition as one unit: status, counters, error and backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureUpdate {
    pub message: String,
    pub kind: SyncErrorKind,
    /// Increment `retry_count` (false for the "already exhausted" path).
    pub count_attempt: bool,
    /// Raise `retry_count` to at least this value.
    pub exhaust_to: Option<u32>,
    pub next_attempt_at: Option<i64>,
}

impl FailureUpdate {
    pub fn new(kind: SyncErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            count_attempt: true,
            exhaust_to: None,
            next_attempt_at: None,
        }
    }

    #[must_use]
    pub fn uncounted(mut self) -> Self {
        self.count_attempt = false;
        self
    }

    #[must_use]
    pub fn exhausting(mut self, max_attempts: u32) -> Self {
        self.exhaust_to = Some(max_attempts);
        self
    }

    #[must_use]
    pub fn retry_not_before(mut self, at: i64) -> Self {
        self.next_attempt_at = Some(at);
        self
    }
}
