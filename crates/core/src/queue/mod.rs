//! Durable queue of records awaiting remote persistence

pub mod ports;
