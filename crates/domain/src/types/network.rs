//! Connectivity types

use serde::{Deserialize, Serialize};

/// Link quality bucket. Variants are declared worst to best so `Ord`
/// follows quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkQuality {
    Offline,
    Poor,
    Good,
    Excellent,
}

crate::impl_domain_status_conversions!(NetworkQuality {
    Offline => "offline",
    Poor => "poor",
    Good => "good",
    Excellent => "excellent",
});

/// Whether the wider internet is reachable over the current link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    Reachable,
    Unreachable,
    Unknown,
}

impl From<Option<bool>> for Reachability {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Reachable,
            Some(false) => Self::Unreachable,
            None => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellularGeneration {
    Unknown,
    G2,
    G3,
    G4,
    G5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "generation")]
pub enum ConnectionType {
    None,
    Wifi,
    Ethernet,
    Cellular(CellularGeneration),
    Other,
}

/// Raw connectivity facts as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectivitySnapshot {
    pub connected: bool,
    #[serde(default)]
    pub reachable: Option<bool>,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub downlink_mbps: Option<f64>,
    #[serde(default)]
    pub rtt_ms: Option<u32>,
}

impl ConnectivitySnapshot {
    pub fn offline() -> Self {
        Self {
            connected: false,
            reachable: Some(false),
            connection_type: ConnectionType::None,
            downlink_mbps: None,
            rtt_ms: None,
        }
    }

    pub fn online(connection_type: ConnectionType) -> Self {
        Self { connected: true, reachable: Some(true), connection_type, downlink_mbps: None, rtt_ms: None }
    }

    #[must_use]
    pub fn with_link(mut self, downlink_mbps: f64, rtt_ms: u32) -> Self {
        self.downlink_mbps = Some(downlink_mbps);
        self.rtt_ms = Some(rtt_ms);
        self
    }

    #[must_use]
    pub fn with_reachable(mut self, reachable: Option<bool>) -> Self {
        self.reachable = reachable;
        self
    }
}

/// Derived connectivity status. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub connected: bool,
    pub reachable: Reachability,
    pub quality: NetworkQuality,
    pub connection_type: ConnectionType,
}

impl NetworkStatus {
    pub fn offline() -> Self {
        Self {
            connected: false,
            reachable: Reachability::Unreachable,
            quality: NetworkQuality::Offline,
            connection_type: ConnectionType::None,
        }
    }

    /// Connected with confirmed reachability; the gate for any drain.
    pub fn is_usable(&self) -> bool {
        self.connected && self.reachable == Reachability::Reachable
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::offline()
    }
}
