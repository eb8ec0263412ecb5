//! Venue connector contract
//!
//! Every venue integration exposes this uniform capability surface. The
//! registry owns connector lifecycles: `initialize` runs before first use,
//! `cleanup` after last use.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;
use crate::errors::ArbResult;
use crate::types::{
    Balance, OrderBookSnapshot, OrderRequest, OrderResult, UnifiedMarketData, VenueEvent,
    VenueHealth, VenueStatus,
};

/// Static per-venue configuration captured at registration time.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    /// Taker fee per leg, percent of notional.
    pub taker_fee_percent: Decimal,
    /// Typical order round-trip latency used for pre-trade estimates.
    pub avg_latency_ms: u64,
    pub max_connections: u32,
    pub rate_limit_per_sec: u32,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            taker_fee_percent: dec!(0.1),
            avg_latency_ms: 150,
            max_connections: 4,
            rate_limit_per_sec: 10,
        }
    }
}

#[async_trait]
pub trait VenueConnector: Send + Sync {
    /// Connector name, used for logging and event tagging.
    fn name(&self) -> &str;

    async fn initialize(&self) -> ArbResult<()>;

    async fn cleanup(&self) -> ArbResult<()>;

    async fn status(&self) -> VenueStatus;

    async fn health(&self) -> VenueHealth;

    async fn market_data(&self, symbol: &str) -> ArbResult<UnifiedMarketData>;

    async fn order_book(&self, symbol: &str, depth: usize) -> ArbResult<OrderBookSnapshot>;

    /// Submit an order. An exchange-side rejection comes back as
    /// `OrderResult { success: false, .. }`; transport failures are `Err`.
    async fn place_order(&self, order: &OrderRequest) -> ArbResult<OrderResult>;

    async fn balances(&self) -> ArbResult<Vec<Balance>>;

    /// Status-change/error/order notifications, re-published by the registry.
    fn subscribe_events(&self) -> broadcast::Receiver<VenueEvent>;
}
