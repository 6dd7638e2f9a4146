use std::time::Duration;

use fieldsync_domain::FieldSyncError;
use tracing::{info, warn};

/// Log the outcome of a command execution with structured fields.
///
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution(
    command: &str,
    elapsed: Duration,
    error_type: Option<&'static str>,
) {
    let duration_ms = elapsed.as_millis() as u64;

    match error_type {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(error_type) => warn!(command, duration_ms, error_type, "command_execution_failure"),
    }
}

/// Convert a `FieldSyncError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &FieldSyncError) -> &'static str {
    match error {
        FieldSyncError::Database(_) => "database",
        FieldSyncError::Config(_) => "config",
        FieldSyncError::Platform(_) => "platform",
        FieldSyncError::Network(_) => "network",
        FieldSyncError::NotFound(_) => "not_found",
        FieldSyncError::InvalidInput(_) => "invalid_input",
        FieldSyncError::InvalidTransition { .. } => "invalid_transition",
        FieldSyncError::Internal(_) => "internal",
    }
}
