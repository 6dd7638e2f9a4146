//! HTTP adapter for the remote record and media endpoints

pub mod client;

pub use client::RemoteApiClient;
