//! Pluggable fee and latency estimation
//!
//! Both models are heuristics fed from per-venue registration config, kept
//! behind traits so live-queried implementations can be swapped in.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

pub trait FeeModel: Send + Sync {
    /// Taker fee for one leg on `venue_id`, percent of notional.
    fn fee_percent(&self, venue_id: &str) -> Decimal;

    /// Estimated fees for one unit of volume across both legs.
    fn per_unit_fees(
        &self,
        buy_venue: &str,
        buy_price: Decimal,
        sell_venue: &str,
        sell_price: Decimal,
    ) -> Decimal {
        self.fee_percent(buy_venue) / Decimal::ONE_HUNDRED * buy_price
            + self.fee_percent(sell_venue) / Decimal::ONE_HUNDRED * sell_price
    }

    /// Absolute fee estimate for one leg.
    fn leg_fee(&self, venue_id: &str, price: Decimal, quantity: Decimal) -> Decimal {
        self.fee_percent(venue_id) / Decimal::ONE_HUNDRED * price * quantity
    }
}

pub trait LatencyModel: Send + Sync {
    fn venue_latency_ms(&self, venue_id: &str) -> u64;

    /// Estimated wall-clock for one dual-leg execution. Legs are dispatched
    /// together, so the slower venue dominates.
    fn estimated_execution_ms(&self, buy_venue: &str, sell_venue: &str) -> u64 {
        self.venue_latency_ms(buy_venue)
            .max(self.venue_latency_ms(sell_venue))
    }
}

/// Fee table keyed by venue, populated at registration time.
pub struct VenueFeeTable {
    rates: RwLock<HashMap<String, Decimal>>,
    default_percent: Decimal,
}

impl VenueFeeTable {
    pub fn new(default_percent: Decimal) -> Self {
        Self {
            rates: RwLock::new(HashMap::new()),
            default_percent,
        }
    }

    pub fn set_rate(&self, venue_id: &str, fee_percent: Decimal) {
        self.rates.write().insert(venue_id.to_string(), fee_percent);
    }

    pub fn remove(&self, venue_id: &str) {
        self.rates.write().remove(venue_id);
    }
}

impl FeeModel for VenueFeeTable {
    fn fee_percent(&self, venue_id: &str) -> Decimal {
        self.rates
            .read()
            .get(venue_id)
            .copied()
            .unwrap_or(self.default_percent)
    }
}

/// Latency table keyed by venue, populated at registration time.
pub struct VenueLatencyTable {
    latencies: RwLock<HashMap<String, u64>>,
    default_ms: u64,
}

impl VenueLatencyTable {
    pub fn new(default_ms: u64) -> Self {
        Self {
            latencies: RwLock::new(HashMap::new()),
            default_ms,
        }
    }

    pub fn set_latency(&self, venue_id: &str, latency_ms: u64) {
        self.latencies.write().insert(venue_id.to_string(), latency_ms);
    }

    pub fn remove(&self, venue_id: &str) {
        self.latencies.write().remove(venue_id);
    }
}

impl LatencyModel for VenueLatencyTable {
    fn venue_latency_ms(&self, venue_id: &str) -> u64 {
        self.latencies
            .read()
            .get(venue_id)
            .copied()
            .unwrap_or(self.default_ms)
    }
}
