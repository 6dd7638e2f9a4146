//! Configuration loader
//!
//! Builds the application [`Config`] from three layers.
//!
//! ## Loading Strategy
//! 1. Defaults from [`Config::default`]
//! 2. A config file: `FIELDSYNC_CONFIG` if set, otherwise the first probed
//!    path that exists (JSON or TOML, detected by extension)
//! 3. `FIELDSYNC_*` environment variables (a `.env` file is read first
//!    through `dotenvy`, without overriding the real environment)
//!
//! The merged result is validated before it is returned.
//!
//! ## Environment Variables
//! - `FIELDSYNC_DB_PATH`, `FIELDSYNC_DB_POOL_SIZE`
//! - `FIELDSYNC_BATCH_SIZE`, `FIELDSYNC_MAX_RETRY_ATTEMPTS`
//! - `FIELDSYNC_BASE_DELAY_MS`, `FIELDSYNC_BACKOFF_MULTIPLIER`, `FIELDSYNC_MAX_DELAY_MS`
//! - `FIELDSYNC_BATCH_PAUSE_MS`, `FIELDSYNC_REJECTION_POLICY` (`exhaust` | `retry`)
//! - `FIELDSYNC_AUTO_SYNC_ENABLED`, `FIELDSYNC_AUTO_SYNC_DEBOUNCE_MS`,
//!   `FIELDSYNC_AUTO_SYNC_INTERVAL_SECS` (`0` disables the interval)
//! - `FIELDSYNC_REMOTE_URL`, `FIELDSYNC_REMOTE_TIMEOUT_SECS`, `FIELDSYNC_API_TOKEN`
//! - `FIELDSYNC_LOG_FILTER`, `FIELDSYNC_LOG_JSON`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.{json,toml}` and `./fieldsync.{json,toml}`
//! 2. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fieldsync_domain::{Config, FieldSyncError, RejectionPolicy, Result};
use url::Url;

pub const CONFIG_PATH_VAR: &str = "FIELDSYNC_CONFIG";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.json", "config.toml", "fieldsync.json", "fieldsync.toml"];

/// Load configuration: defaults, then file, then environment.
///
/// # Errors
/// Returns `FieldSyncError::Config` if:
/// - `FIELDSYNC_CONFIG` names a missing or unreadable file
/// - The file format is invalid
/// - An environment variable cannot be parsed
/// - The merged configuration fails validation
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env file");
    }

    let explicit = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    let mut config = match explicit.or_else(probe_config_paths) {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("no config file found; starting from defaults");
            Config::default()
        }
    };

    apply_env_overrides(&mut config)?;
    validate(&config)?;

    tracing::info!(
        db_path = %config.database.path,
        remote = %config.remote.base_url,
        batch_size = config.sync.batch_size,
        auto_sync = config.sync.auto_sync_enabled,
        "configuration loaded"
    );
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
/// Missing sections and fields take their defaults.
///
/// # Errors
/// Returns `FieldSyncError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(FieldSyncError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            FieldSyncError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| FieldSyncError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| FieldSyncError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| FieldSyncError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(FieldSyncError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a config file.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Overlay `FIELDSYNC_*` environment variables onto `config`.
///
/// Unset variables leave the field untouched.
///
/// # Errors
/// Returns `FieldSyncError::Config` if a variable is set but cannot be parsed.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(path) = env_string("FIELDSYNC_DB_PATH") {
        config.database.path = path;
    }
    if let Some(size) = env_parse("FIELDSYNC_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }

    let sync = &mut config.sync;
    if let Some(value) = env_parse("FIELDSYNC_BATCH_SIZE")? {
        sync.batch_size = value;
    }
    if let Some(value) = env_parse("FIELDSYNC_MAX_RETRY_ATTEMPTS")? {
        sync.max_retry_attempts = value;
    }
    if let Some(value) = env_parse("FIELDSYNC_BASE_DELAY_MS")? {
        sync.base_delay_ms = value;
    }
    if let Some(value) = env_parse("FIELDSYNC_BACKOFF_MULTIPLIER")? {
        sync.backoff_multiplier = value;
    }
    if let Some(value) = env_parse("FIELDSYNC_MAX_DELAY_MS")? {
        sync.max_delay_ms = value;
    }
    if let Some(value) = env_parse("FIELDSYNC_BATCH_PAUSE_MS")? {
        sync.batch_pause_ms = value;
    }
    if let Some(raw) = env_string("FIELDSYNC_REJECTION_POLICY") {
        sync.rejection_policy = RejectionPolicy::from_str(raw.trim()).map_err(|e| {
            FieldSyncError::Config(format!("Invalid FIELDSYNC_REJECTION_POLICY: {}", e))
        })?;
    }
    if let Some(enabled) = env_bool("FIELDSYNC_AUTO_SYNC_ENABLED")? {
        sync.auto_sync_enabled = enabled;
    }
    if let Some(value) = env_parse("FIELDSYNC_AUTO_SYNC_DEBOUNCE_MS")? {
        sync.auto_sync_debounce_ms = value;
    }
    if let Some(value) = env_parse::<u64>("FIELDSYNC_AUTO_SYNC_INTERVAL_SECS")? {
        sync.auto_sync_interval_secs = (value > 0).then_some(value);
    }

    if let Some(url) = env_string("FIELDSYNC_REMOTE_URL") {
        config.remote.base_url = url;
    }
    if let Some(value) = env_parse("FIELDSYNC_REMOTE_TIMEOUT_SECS")? {
        config.remote.timeout_secs = value;
    }
    if let Some(token) = env_string("FIELDSYNC_API_TOKEN") {
        config.remote.api_token = Some(token);
    }

    if let Some(filter) = env_string("FIELDSYNC_LOG_FILTER") {
        config.logging.filter = filter;
    }
    if let Some(json) = env_bool("FIELDSYNC_LOG_JSON")? {
        config.logging.json = json;
    }

    Ok(())
}

/// Full validation: the domain rules plus the remote base URL.
pub fn validate(config: &Config) -> Result<()> {
    config.validate()?;

    let url = Url::parse(config.remote.base_url.trim()).map_err(|e| {
        FieldSyncError::Config(format!("remote.base_url is not a valid URL: {}", e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FieldSyncError::Config(format!(
            "remote.base_url must use http or https, got {}",
            url.scheme()
        )));
    }
    if config.remote.timeout_secs == 0 {
        return Err(FieldSyncError::Config("remote.timeout_secs must be at least 1".into()));
    }
    Ok(())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| FieldSyncError::Config(format!("Invalid {}: {}", key, e)))
        })
        .transpose()
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn env_bool(key: &str) -> Result<Option<bool>> {
    let Some(raw) = env_string(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        other => Err(FieldSyncError::Config(format!("Invalid {}: {:?} is not a boolean", key, other))),
    }
}
