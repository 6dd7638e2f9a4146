//! Connectivity, lifecycle and remote maintenance commands

use fieldsync_core::RecordClient;
use fieldsync_domain::{
    ConnectivitySnapshot, FieldSyncError, NetworkStatus, RemoteError, Result as DomainResult,
};
use tracing::debug;

use crate::context::AppContext;
use crate::utils::execute_logged;

/// Push a platform connectivity event; returns the derived status.
pub fn report_connectivity(ctx: &AppContext, snapshot: ConnectivitySnapshot) -> NetworkStatus {
    ctx.probe.set(snapshot);
    let status = ctx.network.handle_snapshot(&snapshot);
    debug!(quality = %status.quality, usable = status.is_usable(), "connectivity reported");
    status
}

/// The host app came to the foreground.
///
/// Returns whether an auto-sync trigger was running to receive it.
pub async fn app_foregrounded(ctx: &AppContext) -> bool {
    ctx.notify_foreground().await
}

pub fn network_status(ctx: &AppContext) -> NetworkStatus {
    ctx.network.current()
}

/// Delete a record that already exists on the remote.
pub async fn delete_remote_record(ctx: &AppContext, remote_id: &str) -> DomainResult<()> {
    execute_logged("network::delete_remote_record", || async {
        if remote_id.trim().is_empty() {
            return Err(FieldSyncError::InvalidInput("remote id must not be empty".into()));
        }
        ctx.remote.delete_record(remote_id).await.map_err(remote_to_domain)
    })
    .await
}

fn remote_to_domain(err: RemoteError) -> FieldSyncError {
    match err {
        RemoteError::UploadFailed(message) => FieldSyncError::Network(message),
        RemoteError::Server { status, message } => {
            FieldSyncError::Network(format!("remote server error ({status}): {message}"))
        }
        RemoteError::Rejected { status: 404, message } => FieldSyncError::NotFound(message),
        RemoteError::Rejected { status, message } => {
            FieldSyncError::InvalidInput(format!("rejected by remote ({status}): {message}"))
        }
        RemoteError::Local(message) => FieldSyncError::Internal(message),
    }
}
