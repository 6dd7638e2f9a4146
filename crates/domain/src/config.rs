//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTO_SYNC_DEBOUNCE_MS, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY_MS,
    DEFAULT_BATCH_PAUSE_MS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_DELAY_MS, DEFAULT_REMOTE_TIMEOUT_SECS,
    MAX_RETRY_ATTEMPTS,
};
use crate::errors::{FieldSyncError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(FieldSyncError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(FieldSyncError::Config("database.pool_size must be at least 1".into()));
        }
        self.sync.validate()?;
        if self.remote.base_url.trim().is_empty() {
            return Err(FieldSyncError::Config("remote.base_url must not be empty".into()));
        }
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "fieldsync.db".to_string(), pool_size: 4 }
    }
}

/// What to do with a record the remote rejected with a 4xx.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Use up the retry budget on the first rejection.
    #[default]
    Exhaust,
    /// Count it like any transient failure.
    Retry,
}

crate::impl_domain_status_conversions!(RejectionPolicy {
    Exhaust => "exhaust",
    Retry => "retry",
});

/// Sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub max_retry_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
    pub batch_pause_ms: u64,
    pub rejection_policy: RejectionPolicy,
    pub auto_sync_enabled: bool,
    pub auto_sync_debounce_ms: u64,
    /// Periodic auto-sync while the link is usable; `None` disables it.
    pub auto_sync_interval_secs: Option<u64>,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FieldSyncError::Config("sync.batch_size must be at least 1".into()));
        }
        if self.max_retry_attempts == 0 {
            return Err(FieldSyncError::Config(
                "sync.max_retry_attempts must be at least 1".into(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(FieldSyncError::Config(format!(
                "sync.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(FieldSyncError::Config(
                "sync.max_delay_ms must not be smaller than sync.base_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            batch_pause_ms: DEFAULT_BATCH_PAUSE_MS,
            rejection_policy: RejectionPolicy::default(),
            auto_sync_enabled: true,
            auto_sync_debounce_ms: DEFAULT_AUTO_SYNC_DEBOUNCE_MS,
            auto_sync_interval_secs: None,
        }
    }
}

/// Remote service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            api_token: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info,fieldsync=debug".to_string(), json: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.sync.batch_size, 5);
        assert_eq!(config.sync.max_retry_attempts, 3);
        assert_eq!(config.sync.auto_sync_debounce_ms, 2_000);
        assert_eq!(config.sync.rejection_policy, RejectionPolicy::Exhaust);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut config = Config::default();
        config.sync.batch_size = 0;
        assert!(matches!(config.validate(), Err(FieldSyncError::Config(_))));
    }

    #[test]
    fn shrinking_multiplier_is_rejected() {
        let sync = SyncConfig { backoff_multiplier: 0.5, ..SyncConfig::default() };
        assert!(sync.validate().is_err());
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"sync":{"batch_size":2,"rejection_policy":"retry"}}"#).unwrap();
        assert_eq!(config.sync.batch_size, 2);
        assert_eq!(config.sync.rejection_policy, RejectionPolicy::Retry);
        assert_eq!(config.sync.max_retry_attempts, MAX_RETRY_ATTEMPTS);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn api_token_is_never_serialized() {
        let mut config = Config::default();
        config.remote.api_token = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
