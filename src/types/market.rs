//! Market data and order types shared across venues

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Freshness classification for a venue snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataQuality {
    Realtime,
    Delayed,
    Stale,
}

/// Per-venue snapshot of one symbol, normalized across connectors.
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedMarketData {
    pub venue_id: String,
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_depth: Decimal,
    pub ask_depth: Decimal,
    pub spread: Decimal,
    pub quality: DataQuality,
    pub last_update: DateTime<Utc>,
}

impl UnifiedMarketData {
    /// Quoted spread as a percentage of the mid price.
    pub fn spread_percent(&self) -> Decimal {
        let mid = (self.bid + self.ask) / Decimal::TWO;
        if mid.is_zero() {
            return Decimal::ZERO;
        }
        self.spread / mid * Decimal::ONE_HUNDRED
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBookSnapshot {
    pub venue_id: String,
    pub symbol: String,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub last_update: DateTime<Utc>,
}

/// Asset balance as reported by a single venue.
#[derive(Debug, Clone, Serialize)]
pub struct Balance {
    pub asset: String,
    pub total: Decimal,
    pub usd_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeInForce {
    /// Fill what is immediately available, cancel the remainder.
    ImmediateOrCancel,
    GoodTillCancelled,
}

/// Order forwarded to a venue connector.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    pub fn ioc(symbol: &str, side: OrderSide, quantity: Decimal, limit_price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            quantity,
            limit_price: Some(limit_price),
            time_in_force: TimeInForce::ImmediateOrCancel,
        }
    }
}

/// Outcome of a single order submission as reported by the venue.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub execution_price: Option<Decimal>,
    pub executed_quantity: Option<Decimal>,
    pub fees: Option<Decimal>,
    pub error: Option<String>,
}
