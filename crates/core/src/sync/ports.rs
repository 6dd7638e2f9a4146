//! Port interfaces for sync operations

use async_trait::async_trait;
use fieldsync_domain::{RemoteError, RemoteMediaRef, SyncResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One media upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUploadRequest {
    /// Record that owns the attachment.
    pub owner_id: String,
    pub attachment_id: String,
    pub local_ref: String,
    /// Stable across retries of the same attachment.
    pub attempt_id: String,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

/// Remote record creation with already resolved media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRecordRequest {
    pub record_id: String,
    pub idempotency_key: String,
    pub payload: Value,
    pub media: Vec<RemoteMediaRef>,
}

/// Uploads a single attached binary and returns its remote reference.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload_media(&self, request: &MediaUploadRequest) -> Result<String, RemoteError>;
}

/// Creates and deletes logical records on the remote service.
#[async_trait]
pub trait RecordClient: Send + Sync {
    /// Returns the remote id of the created record.
    async fn create_record(&self, request: &CreateRecordRequest) -> Result<String, RemoteError>;

    async fn delete_record(&self, remote_id: &str) -> Result<(), RemoteError>;
}

/// Entry point invoked by the auto-sync trigger.
#[async_trait]
pub trait AutoSyncTarget: Send + Sync {
    async fn auto_sync(&self) -> SyncResult;
}
