//! Risk, quality and confidence scoring for candidate opportunities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use crate::types::{DataQuality, OpportunityQuality, RiskLevel, UnifiedMarketData};

pub const BASE_RISK_SCORE: u32 = 25;
/// Thinner side's depth is less than 2x the candidate volume.
pub const THIN_DEPTH_PENALTY: u32 = 20;
/// Either side quotes a spread wider than 0.1% of price.
pub const WIDE_SPREAD_PENALTY: u32 = 15;
/// Either side's data is not realtime.
pub const DELAYED_DATA_PENALTY: u32 = 15;
/// Candidate volume would consume more than 80% of the thinner side.
pub const DEPTH_CONSUMED_PENALTY: u32 = 10;
/// Candidates scoring above this are discarded outright.
pub const MAX_ACCEPTABLE_RISK_SCORE: u32 = 80;

const BASE_CONFIDENCE: f64 = 0.5;
const REALTIME_CONFIDENCE_BONUS: f64 = 0.15;
const FRESH_DATA_CONFIDENCE_BONUS: f64 = 0.10;

pub fn risk_score(
    buy: &UnifiedMarketData,
    sell: &UnifiedMarketData,
    volume: Decimal,
) -> u32 {
    let mut score = BASE_RISK_SCORE;
    let thinner_depth = buy.ask_depth.min(sell.bid_depth);

    if thinner_depth < volume * Decimal::TWO {
        score += THIN_DEPTH_PENALTY;
    }
    if buy.spread_percent() > dec!(0.1) || sell.spread_percent() > dec!(0.1) {
        score += WIDE_SPREAD_PENALTY;
    }
    if buy.quality != DataQuality::Realtime || sell.quality != DataQuality::Realtime {
        score += DELAYED_DATA_PENALTY;
    }
    if volume > thinner_depth * dec!(0.8) {
        score += DEPTH_CONSUMED_PENALTY;
    }

    score.min(100)
}

pub fn liquidity_risk(volume: Decimal) -> RiskLevel {
    if volume >= dec!(1000) {
        RiskLevel::Low
    } else if volume >= dec!(100) {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

pub fn execution_risk(estimated_execution_ms: u64) -> RiskLevel {
    if estimated_execution_ms <= 100 {
        RiskLevel::Low
    } else if estimated_execution_ms <= 300 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

pub fn quality_bucket(net_spread_percent: Decimal, volume: Decimal) -> OpportunityQuality {
    if net_spread_percent >= dec!(1.0) && volume >= dec!(1000) {
        OpportunityQuality::Excellent
    } else if net_spread_percent >= dec!(0.5) && volume >= dec!(500) {
        OpportunityQuality::Good
    } else if net_spread_percent >= dec!(0.2) && volume >= dec!(100) {
        OpportunityQuality::Fair
    } else {
        OpportunityQuality::Poor
    }
}

pub fn confidence(
    buy: &UnifiedMarketData,
    sell: &UnifiedMarketData,
    now: DateTime<Utc>,
) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    for side in [buy, sell] {
        if side.quality == DataQuality::Realtime {
            confidence += REALTIME_CONFIDENCE_BONUS;
        }
        if (now - side.last_update) < chrono::Duration::seconds(1) {
            confidence += FRESH_DATA_CONFIDENCE_BONUS;
        }
    }
    confidence.min(1.0)
}
