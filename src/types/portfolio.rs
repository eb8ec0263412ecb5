//! Cross-venue portfolio aggregation types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AssetAllocation {
    pub asset: String,
    pub total: Decimal,
    pub usd_value: Decimal,
    pub allocation_percent: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct VenueExposure {
    pub venue_id: String,
    pub usd_value: Decimal,
    pub share_percent: Decimal,
}

/// Balances aggregated across all active venues (settle-all), cached with a
/// TTL and refreshed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct CrossVenuePortfolio {
    pub total_value: Decimal,
    pub assets: Vec<AssetAllocation>,
    pub venues: Vec<VenueExposure>,
    /// Largest single-asset allocation percent.
    pub concentration_risk: Decimal,
    /// Largest single-venue share percent.
    pub venue_risk: Decimal,
    pub updated_at: DateTime<Utc>,
}
