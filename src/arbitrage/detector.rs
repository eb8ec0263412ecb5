//! Opportunity detection across venue pairs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use crate::config::ArbitrageConfig;
use crate::types::{ArbEvent, ArbitrageOpportunity, UnifiedMarketData};
use crate::venues::VenueAggregator;
use super::models::{FeeModel, LatencyModel};
use super::scoring;

/// Evaluate one ordered venue pair for `symbol`: buy at `buy`'s ask, sell at
/// `sell`'s bid. Returns `None` when the candidate fails any filter.
pub fn evaluate_candidate(
    symbol: &str,
    buy: &UnifiedMarketData,
    sell: &UnifiedMarketData,
    config: &ArbitrageConfig,
    fee_model: &dyn FeeModel,
    latency_model: &dyn LatencyModel,
    now: DateTime<Utc>,
) -> Option<ArbitrageOpportunity> {
    let buy_price = buy.ask;
    let sell_price = sell.bid;
    if buy_price <= Decimal::ZERO {
        return None;
    }

    let gross_spread = sell_price - buy_price;
    if gross_spread <= Decimal::ZERO {
        return None;
    }

    let max_volume = buy.ask_depth.min(sell.bid_depth);
    if max_volume < config.min_volume_threshold {
        return None;
    }

    let estimated_fees =
        fee_model.per_unit_fees(&buy.venue_id, buy_price, &sell.venue_id, sell_price);
    let net_spread = gross_spread - estimated_fees;
    let net_spread_percent = net_spread / buy_price * Decimal::ONE_HUNDRED;

    if net_spread_percent < config.min_profit_threshold {
        return None;
    }
    // Spreads beyond the ceiling are data-quality outliers, not trades.
    if net_spread_percent > config.max_profit_threshold {
        return None;
    }

    let estimated_execution_ms =
        latency_model.estimated_execution_ms(&buy.venue_id, &sell.venue_id);
    if estimated_execution_ms > config.max_latency_ms {
        return None;
    }

    let risk_score = scoring::risk_score(buy, sell, max_volume);
    if risk_score > scoring::MAX_ACCEPTABLE_RISK_SCORE {
        return None;
    }

    Some(ArbitrageOpportunity {
        // Deterministic id: a fresh detection cycle supersedes the previous
        // entry for the same pair instead of accumulating duplicates.
        id: format!("{}:{}:{}", symbol, buy.venue_id, sell.venue_id),
        symbol: symbol.to_string(),
        buy_venue: buy.venue_id.clone(),
        sell_venue: sell.venue_id.clone(),
        buy_price,
        sell_price,
        net_spread,
        net_spread_percent,
        max_volume,
        estimated_profit: net_spread * max_volume,
        required_capital: buy_price * max_volume,
        risk_score,
        liquidity_risk: scoring::liquidity_risk(max_volume),
        execution_risk: scoring::execution_risk(estimated_execution_ms),
        quality: scoring::quality_bucket(net_spread_percent, max_volume),
        confidence: scoring::confidence(buy, sell, now),
        detected_at: now,
        expires_at: now + chrono::Duration::milliseconds(config.opportunity_expiry_ms as i64),
    })
}

pub struct OpportunityDetector {
    config: ArbitrageConfig,
    aggregator: Arc<VenueAggregator>,
    fee_model: Arc<dyn FeeModel>,
    latency_model: Arc<dyn LatencyModel>,
    active: RwLock<HashMap<String, ArbitrageOpportunity>>,
    events: broadcast::Sender<ArbEvent>,
}

impl OpportunityDetector {
    pub fn new(
        config: ArbitrageConfig,
        aggregator: Arc<VenueAggregator>,
        fee_model: Arc<dyn FeeModel>,
        latency_model: Arc<dyn LatencyModel>,
        events: broadcast::Sender<ArbEvent>,
    ) -> Self {
        Self {
            config,
            aggregator,
            fee_model,
            latency_model,
            active: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// One detection cycle over `symbols`: aggregate quotes, evaluate every
    /// ordered venue pair in both directions, refresh the active set, and
    /// return survivors sorted by net spread percent descending.
    pub async fn detect(&self, symbols: &[String]) -> Vec<ArbitrageOpportunity> {
        let mut survivors = Vec::new();

        for symbol in symbols {
            let snapshots = match self.aggregator.aggregated_market_data(symbol).await {
                Ok(snapshots) => snapshots,
                Err(e) => {
                    warn!("Skipping {} this cycle: {}", symbol, e);
                    continue;
                }
            };
            if snapshots.len() < 2 {
                debug!("Need at least two venues for {}, have {}", symbol, snapshots.len());
                continue;
            }

            let now = Utc::now();
            let mut found = 0usize;
            for (buy_id, buy) in &snapshots {
                for (sell_id, sell) in &snapshots {
                    if buy_id == sell_id {
                        continue;
                    }
                    if let Some(opportunity) = evaluate_candidate(
                        symbol,
                        buy,
                        sell,
                        &self.config,
                        self.fee_model.as_ref(),
                        self.latency_model.as_ref(),
                        now,
                    ) {
                        found += 1;
                        if opportunity.net_spread_percent >= self.config.alert_spread_percent
                            || opportunity.max_volume >= self.config.alert_volume
                        {
                            let _ = self.events.send(ArbEvent::HighValueOpportunity {
                                opportunity: opportunity.clone(),
                            });
                        }
                        survivors.push(opportunity);
                    }
                }
            }

            if found > 0 {
                info!("Detected {} opportunities for {}", found, symbol);
                let _ = self.events.send(ArbEvent::OpportunitiesDetected {
                    symbol: symbol.clone(),
                    count: found,
                });
            }
        }

        survivors.sort_by(|a, b| b.net_spread_percent.cmp(&a.net_spread_percent));

        {
            let mut active = self.active.write().await;
            let now = Utc::now();
            active.retain(|_, opportunity| !opportunity.is_expired(now));
            for opportunity in &survivors {
                active.insert(opportunity.id.clone(), opportunity.clone());
            }
        }

        survivors
    }

    pub async fn active_opportunities(&self) -> Vec<ArbitrageOpportunity> {
        let mut opportunities: Vec<ArbitrageOpportunity> =
            self.active.read().await.values().cloned().collect();
        opportunities.sort_by(|a, b| b.net_spread_percent.cmp(&a.net_spread_percent));
        opportunities
    }

    /// Drop expired entries from the active set; returns how many went.
    pub async fn prune_expired(&self) -> usize {
        let mut active = self.active.write().await;
        let before = active.len();
        let now = Utc::now();
        active.retain(|_, opportunity| !opportunity.is_expired(now));
        before - active.len()
    }

    pub async fn clear(&self) {
        self.active.write().await.clear();
    }
}
