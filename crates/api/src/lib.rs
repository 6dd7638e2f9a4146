//! # FieldSync API
//!
//! Application layer - command surface and the agent entry point.
//!
//! This crate contains:
//! - Commands a host shell (mobile bridge, desktop UI, CLI) calls into
//! - Application context (dependency injection)
//! - The `fieldsync-agent` binary
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
