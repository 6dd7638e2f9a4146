//! Media attached to queued records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{FieldSyncError, Result};

/// A binary (usually a photo) owned by a [`super::PendingRecord`].
///
/// Once `uploaded` is set, `remote_ref` is present and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub id: String,
    pub record_id: String,
    pub position: u32,
    pub local_ref: String,
    pub remote_ref: Option<String>,
    pub uploaded: bool,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

impl MediaAttachment {
    pub(crate) fn from_new(new: NewMediaAttachment, record_id: &str, position: u32) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            record_id: record_id.to_string(),
            position,
            local_ref: new.local_ref,
            remote_ref: None,
            uploaded: false,
            size_bytes: new.size_bytes,
            mime_type: new.mime_type,
        }
    }

    /// Record a successful upload.
    ///
    /// Repeating the same reference is a no-op; a different reference for an
    /// already uploaded attachment is rejected.
    pub fn mark_uploaded(&mut self, remote_ref: impl Into<String>) -> Result<()> {
        let remote_ref = remote_ref.into();
        match (&self.remote_ref, self.uploaded) {
            (Some(existing), true) if *existing == remote_ref => Ok(()),
            (Some(existing), true) => Err(FieldSyncError::InvalidInput(format!(
                "attachment {} already uploaded as {existing}",
                self.id
            ))),
            _ => {
                self.remote_ref = Some(remote_ref);
                self.uploaded = true;
                Ok(())
            }
        }
    }

    pub fn remote_media_ref(&self) -> Option<RemoteMediaRef> {
        match (&self.remote_ref, self.uploaded) {
            (Some(remote_ref), true) => {
                Some(RemoteMediaRef { attachment_id: self.id.clone(), remote_ref: remote_ref.clone() })
            }
            _ => None,
        }
    }
}

/// Caller input describing a local file to attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMediaAttachment {
    pub local_ref: String,
    pub size_bytes: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl NewMediaAttachment {
    pub fn new(local_ref: impl Into<String>, size_bytes: u64) -> Self {
        Self { local_ref: local_ref.into(), size_bytes, mime_type: None }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Resolved reference passed to the remote create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMediaRef {
    pub attachment_id: String,
    pub remote_ref: String,
}
