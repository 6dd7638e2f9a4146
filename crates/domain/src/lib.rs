//! # FieldSync Domain
//!
//! Business domain types and models for the FieldSync offline sync engine.
//!
//! This crate contains:
//! - Queue data types (PendingRecord, MediaAttachment) and the record
//!   status state machine
//! - Network status and sync progress/result types
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other FieldSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::text::truncate_reason;
