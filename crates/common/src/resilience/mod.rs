//! Resilience primitives

pub mod backoff;

pub use backoff::ExponentialBackoff;
