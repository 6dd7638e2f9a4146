//! Error types used throughout the sync engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RecordStatus;

/// Main error type for FieldSync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FieldSyncError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Illegal status transition for record {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: RecordStatus, to: RecordStatus },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for FieldSync operations
pub type Result<T> = std::result::Result<T, FieldSyncError>;

/// Failure taxonomy reported per item in a [`crate::SyncResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// No connectivity; no attempt was made.
    NetworkUnavailable,
    /// Transient transport failure while talking to the remote.
    UploadFailed,
    /// Remote refused the request (4xx); retrying cannot help.
    RemoteRejected,
    /// Remote failed (5xx); retryable.
    ServerError,
    /// The record has used up its attempts.
    ExceededRetryLimit,
    /// Local persistence failed; the item is left as-is.
    LocalStorageError,
    /// Another drain already holds the single-flight guard.
    SyncInProgress,
}

crate::impl_domain_status_conversions!(SyncErrorKind {
    NetworkUnavailable => "network_unavailable",
    UploadFailed => "upload_failed",
    RemoteRejected => "remote_rejected",
    ServerError => "server_error",
    ExceededRetryLimit => "exceeded_retry_limit",
    LocalStorageError => "local_storage_error",
    SyncInProgress => "sync_in_progress",
});

impl SyncErrorKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::UploadFailed | Self::ServerError | Self::NetworkUnavailable)
    }
}

/// Errors returned by the remote media and record contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport-level failure (connect, timeout, reset) or a transient
    /// status such as 408/429 on the media endpoint.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Non-retryable client error.
    #[error("rejected by remote ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Server-side failure.
    #[error("remote server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The local side of the call failed (e.g. media file unreadable).
    #[error("local error: {0}")]
    Local(String),
}

impl RemoteError {
    /// Map onto the per-item taxonomy.
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::UploadFailed(_) => SyncErrorKind::UploadFailed,
            Self::Rejected { .. } => SyncErrorKind::RemoteRejected,
            Self::Server { .. } => SyncErrorKind::ServerError,
            Self::Local(_) => SyncErrorKind::LocalStorageError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<FieldSyncError> for RemoteError {
    fn from(err: FieldSyncError) -> Self {
        Self::Local(err.to_string())
    }
}
