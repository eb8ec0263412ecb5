//! Arbitrage opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OpportunityQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// A scored, time-bounded candidate trade between two venues.
///
/// Immutable once created; superseded entries are overwritten by id in the
/// active set and expired ones dropped by the cleanup loop.
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub symbol: String,
    pub buy_venue: String,
    pub sell_venue: String,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub net_spread: Decimal,
    pub net_spread_percent: Decimal,
    pub max_volume: Decimal,
    pub estimated_profit: Decimal,
    pub required_capital: Decimal,
    /// 0-100, higher is riskier.
    pub risk_score: u32,
    pub liquidity_risk: RiskLevel,
    pub execution_risk: RiskLevel,
    pub quality: OpportunityQuality,
    /// 0.0-1.0 confidence in the underlying quotes.
    pub confidence: f64,
    pub detected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
