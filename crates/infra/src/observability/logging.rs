//! `tracing` subscriber installation
//!
//! `RUST_LOG` wins over the configured filter. Installing twice is not an
//! error; the first subscriber stays active.

use fieldsync_domain::{FieldSyncError, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// Resolve the filter: `RUST_LOG` if set and valid, else `config.filter`.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|e| {
        FieldSyncError::Config(format!("invalid logging.filter {:?}: {}", config.filter, e))
    })
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::debug!(json = config.json, "tracing initialised");
    }
    Ok(installed)
}
