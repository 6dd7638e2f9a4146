//! Engine constants
//!
//! Defaults for values that are also exposed through [`crate::SyncConfig`].

/// Records processed per batch; also the per-batch concurrency bound.
pub const DEFAULT_BATCH_SIZE: usize = 5;
/// Failed attempts after which a record is no longer retried automatically.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

// Backoff between attempts for the same record
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5 * 60 * 1_000;

/// Pause between consecutive batches of one drain.
pub const DEFAULT_BATCH_PAUSE_MS: u64 = 250;
/// Debounce applied to auto-sync triggers (connectivity restored, foreground).
pub const DEFAULT_AUTO_SYNC_DEBOUNCE_MS: u64 = 2_000;

/// Maximum stored length of `last_error`.
pub const MAX_ERROR_MESSAGE_LEN: usize = 256;

// Channel capacities
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

// Remote endpoint defaults
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
