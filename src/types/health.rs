//! Venue health and connection-pool types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VenueStatus {
    Connected,
    Connecting,
    Disconnected,
}

/// Structured health snapshot reported by a connector.
#[derive(Debug, Clone, Serialize)]
pub struct VenueHealth {
    pub status: VenueStatus,
    pub latency_ms: u64,
    pub consecutive_errors: u32,
    pub last_heartbeat: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VenueSlots {
    pub active: u32,
    pub available: u32,
}

/// Aggregate view of registry capacity and health, refreshed on
/// registration changes and health-check ticks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionPoolSummary {
    pub per_venue: HashMap<String, VenueSlots>,
    pub total_venues: usize,
    pub healthy_venues: usize,
    /// healthy / total, 1.0 when the registry is empty.
    pub health_ratio: f64,
}
