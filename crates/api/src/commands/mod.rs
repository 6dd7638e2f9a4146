//! Command surface exposed to host shells
//!
//! Each command takes the shared [`crate::AppContext`] and returns a domain
//! `Result`, so bridges can serialize either branch as-is.

pub mod network;
pub mod sync;

pub use network::{app_foregrounded, delete_remote_record, network_status, report_connectivity};
pub use sync::{
    cancel_sync, enqueue_record, failed_records, last_sync_timestamp, pending_count, queue_stats,
    reset_record, retry_all_failed, retry_record, subscribe_progress, subscribe_queue, sync_now,
};
