//! Link-quality classification
//!
//! `offline` when disconnected or explicitly unreachable, `poor` while
//! reachability is unknown, otherwise the lower of the transport ceiling and
//! the bucket implied by measured link metrics. Each component is monotonic
//! in its inputs, so the minimum is as well.

use fieldsync_domain::{
    CellularGeneration, ConnectionType, ConnectivitySnapshot, NetworkQuality, NetworkStatus,
    Reachability,
};

const EXCELLENT_DOWNLINK_MBPS: f64 = 5.0;
const GOOD_DOWNLINK_MBPS: f64 = 1.0;
const EXCELLENT_RTT_MS: u32 = 150;
const GOOD_RTT_MS: u32 = 600;

/// Classify a snapshot into a quality bucket.
pub fn classify(snapshot: &ConnectivitySnapshot) -> NetworkQuality {
    if !snapshot.connected {
        return NetworkQuality::Offline;
    }
    match snapshot.reachable {
        Some(false) => NetworkQuality::Offline,
        None => NetworkQuality::Poor,
        Some(true) => transport_ceiling(snapshot.connection_type)
            .min(downlink_bucket(snapshot.downlink_mbps))
            .min(rtt_bucket(snapshot.rtt_ms)),
    }
}

/// Derive the full status for a snapshot.
pub fn status_from(snapshot: &ConnectivitySnapshot) -> NetworkStatus {
    NetworkStatus {
        connected: snapshot.connected,
        reachable: if snapshot.connected {
            Reachability::from(snapshot.reachable)
        } else {
            Reachability::Unreachable
        },
        quality: classify(snapshot),
        connection_type: snapshot.connection_type,
    }
}

fn transport_ceiling(connection_type: ConnectionType) -> NetworkQuality {
    match connection_type {
        ConnectionType::Ethernet
        | ConnectionType::Wifi
        | ConnectionType::Cellular(CellularGeneration::G5) => NetworkQuality::Excellent,
        ConnectionType::Cellular(CellularGeneration::G4) | ConnectionType::Other => {
            NetworkQuality::Good
        }
        ConnectionType::Cellular(
            CellularGeneration::G3 | CellularGeneration::G2 | CellularGeneration::Unknown,
        )
        | ConnectionType::None => NetworkQuality::Poor,
    }
}

fn downlink_bucket(downlink_mbps: Option<f64>) -> NetworkQuality {
    match downlink_mbps {
        None => NetworkQuality::Excellent,
        Some(mbps) if mbps >= EXCELLENT_DOWNLINK_MBPS => NetworkQuality::Excellent,
        Some(mbps) if mbps >= GOOD_DOWNLINK_MBPS => NetworkQuality::Good,
        Some(_) => NetworkQuality::Poor,
    }
}

fn rtt_bucket(rtt_ms: Option<u32>) -> NetworkQuality {
    match rtt_ms {
        None => NetworkQuality::Excellent,
        Some(rtt) if rtt <= EXCELLENT_RTT_MS => NetworkQuality::Excellent,
        Some(rtt) if rtt <= GOOD_RTT_MS => NetworkQuality::Good,
        Some(_) => NetworkQuality::Poor,
    }
}
