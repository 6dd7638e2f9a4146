//! Command execution helpers
//!
//! Times each command and logs its outcome so individual commands stay
//! focused on their own logic.

use std::future::Future;
use std::time::Instant;

use fieldsync_domain::Result as DomainResult;

use crate::utils::logging::{error_label, log_command_execution};

/// Execute a command with timing and structured logging.
///
/// # Example
///
/// ```rust,ignore
/// pub async fn pending_count(ctx: &AppContext) -> DomainResult<usize> {
///     execute_logged("sync::pending_count", || async {
///         ctx.coordinator.pending_count().await
///     })
///     .await
/// }
/// ```
pub async fn execute_logged<F, Fut, T>(command_name: &str, command_fn: F) -> DomainResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();
    let result = command_fn().await;

    let error_type = result.as_ref().err().map(error_label);
    log_command_execution(command_name, start.elapsed(), error_type);

    result
}
