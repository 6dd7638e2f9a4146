//! Logging setup for binaries embedding the engine

pub mod logging;

pub use logging::{build_filter, init_tracing};
