//! Shared test harness: fast configs, simulated venues, opportunity builders.
#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use cross_arb_bot::arbitrage::{VenueFeeTable, VenueLatencyTable};
use cross_arb_bot::config::ArbitrageConfig;
use cross_arb_bot::lifecycle::ArbitrageEngine;
use cross_arb_bot::types::{
    ArbitrageOpportunity, DataQuality, OpportunityQuality, RiskLevel, UnifiedMarketData,
};
use cross_arb_bot::venues::{SimulatedVenue, VenueConfig};

/// Config tuned for tests: auto-execution on, short intervals, permissive
/// limits unless a test narrows them.
pub fn test_config() -> ArbitrageConfig {
    ArbitrageConfig {
        auto_execute: true,
        price_update_interval_ms: 200,
        opportunity_expiry_ms: 30_000,
        execution_timeout_ms: 2_000,
        ..ArbitrageConfig::default()
    }
}

pub fn fee_table(percent: Decimal) -> Arc<VenueFeeTable> {
    Arc::new(VenueFeeTable::new(percent))
}

pub fn latency_table(ms: u64) -> Arc<VenueLatencyTable> {
    Arc::new(VenueLatencyTable::new(ms))
}

/// A venue quoting one symbol with symmetric depth and a tight spread.
pub fn quoted_venue(
    name: &str,
    symbol: &str,
    bid: Decimal,
    ask: Decimal,
    depth: Decimal,
) -> SimulatedVenue {
    SimulatedVenue::new(name)
        .with_latency(Duration::from_millis(5))
        .with_quote(symbol, bid, ask, depth, depth)
}

pub async fn register(
    engine: &ArbitrageEngine,
    venue_id: &str,
    venue: SimulatedVenue,
    avg_latency_ms: u64,
) {
    engine
        .register_venue(
            venue_id,
            Arc::new(venue),
            VenueConfig {
                taker_fee_percent: dec!(0.1),
                avg_latency_ms,
                ..VenueConfig::default()
            },
        )
        .await
        .expect("venue registration failed");
}

pub fn snapshot(
    venue_id: &str,
    symbol: &str,
    bid: Decimal,
    ask: Decimal,
    bid_depth: Decimal,
    ask_depth: Decimal,
) -> UnifiedMarketData {
    UnifiedMarketData {
        venue_id: venue_id.to_string(),
        symbol: symbol.to_string(),
        bid,
        ask,
        bid_depth,
        ask_depth,
        spread: ask - bid,
        quality: DataQuality::Realtime,
        last_update: Utc::now(),
    }
}

/// A ready-to-execute opportunity between venues `alpha` and `beta`.
pub fn opportunity(
    symbol: &str,
    buy_price: Decimal,
    sell_price: Decimal,
    max_volume: Decimal,
) -> ArbitrageOpportunity {
    let gross = sell_price - buy_price;
    let fees = (buy_price + sell_price) * dec!(0.001);
    let net_spread = gross - fees;
    ArbitrageOpportunity {
        id: format!("{}:alpha:beta", symbol),
        symbol: symbol.to_string(),
        buy_venue: "alpha".to_string(),
        sell_venue: "beta".to_string(),
        buy_price,
        sell_price,
        net_spread,
        net_spread_percent: net_spread / buy_price * Decimal::ONE_HUNDRED,
        max_volume,
        estimated_profit: net_spread * max_volume,
        required_capital: buy_price * max_volume,
        risk_score: 30,
        liquidity_risk: RiskLevel::Medium,
        execution_risk: RiskLevel::Low,
        quality: OpportunityQuality::Good,
        confidence: 0.9,
        detected_at: Utc::now(),
        expires_at: Utc::now() + chrono::Duration::seconds(30),
    }
}
