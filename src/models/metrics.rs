use serde::{Deserialize, Serialize};

use super::{format_bytes, ProfileId};

/// Traffic counters reported by the host for one running profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub requests: u64,
    pub active_connections: u32,
}

impl TrafficStats {
    pub fn summary(&self) -> String {
        format!(
            "↑ {}  ↓ {}  {} req  {} conn",
            format_bytes(self.bytes_sent),
            format_bytes(self.bytes_received),
            self.requests,
            self.active_connections
        )
    }
}

/// Latest telemetry for one profile. `updated_at` increases monotonically
/// per profile on the host side (milliseconds since epoch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub id: ProfileId,
    pub updated_at: u64,
    pub traffic: TrafficStats,
}

impl MetricSnapshot {
    pub fn new(id: impl Into<ProfileId>, updated_at: u64) -> Self {
        Self {
            id: id.into(),
            updated_at,
            traffic: TrafficStats::default(),
        }
    }
}
