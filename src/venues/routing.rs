//! Order routing strategies
//!
//! A closed set of tagged variants rather than open-ended dispatch: each
//! variant has exactly one selection rule.

use std::collections::HashMap;
use rust_decimal::prelude::*;
use crate::errors::{ArbError, ArbResult};
use crate::types::{OrderRequest, OrderSide, UnifiedMarketData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingStrategy {
    /// Lowest ask for buys, highest bid for sells.
    BestPrice,
    /// Price weighted by available depth at the touch.
    SmartRouting,
    /// Always the named venue, provided it is active.
    FixedVenue(String),
}

/// Pick a target venue for `order` out of the venues that currently have a
/// usable snapshot. `active` carries the venue ids eligible for routing.
pub fn select_venue(
    order: &OrderRequest,
    snapshots: &HashMap<String, UnifiedMarketData>,
    active: &[String],
    strategy: &RoutingStrategy,
) -> ArbResult<String> {
    let eligible: Vec<&String> = active
        .iter()
        .filter(|id| snapshots.contains_key(*id))
        .collect();

    if eligible.is_empty() {
        return Err(ArbError::Data {
            venue_id: "*".to_string(),
            message: format!("no active venue has market data for {}", order.symbol),
            source: None,
        });
    }

    match strategy {
        RoutingStrategy::FixedVenue(venue_id) => {
            if active.iter().any(|id| id == venue_id) {
                Ok(venue_id.clone())
            } else {
                Err(ArbError::NotFound {
                    venue_id: venue_id.clone(),
                })
            }
        }
        RoutingStrategy::BestPrice => {
            let best = eligible.into_iter().min_by(|a, b| {
                let da = &snapshots[*a];
                let db = &snapshots[*b];
                match order.side {
                    OrderSide::Buy => da.ask.cmp(&db.ask),
                    OrderSide::Sell => db.bid.cmp(&da.bid),
                }
            });
            // eligible is non-empty, min_by always yields a venue
            Ok(best.map(|id| id.clone()).unwrap_or_default())
        }
        RoutingStrategy::SmartRouting => {
            let best = eligible.into_iter().max_by(|a, b| {
                let sa = smart_score(order, &snapshots[*a]);
                let sb = smart_score(order, &snapshots[*b]);
                sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
            });
            Ok(best.map(|id| id.clone()).unwrap_or_default())
        }
    }
}

/// Higher is better: price competitiveness discounted when the touch cannot
/// absorb the order without eating into depth.
fn smart_score(order: &OrderRequest, data: &UnifiedMarketData) -> f64 {
    let (price, depth) = match order.side {
        OrderSide::Buy => (data.ask, data.ask_depth),
        OrderSide::Sell => (data.bid, data.bid_depth),
    };
    let price = price.to_f64().unwrap_or(f64::MAX);
    let depth = depth.to_f64().unwrap_or(0.0);
    let wanted = order.quantity.to_f64().unwrap_or(0.0);

    let price_score = match order.side {
        OrderSide::Buy => -price,
        OrderSide::Sell => price,
    };
    let depth_penalty = if depth > 0.0 && wanted > depth {
        (wanted / depth).min(10.0)
    } else {
        0.0
    };
    price_score - depth_penalty
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use crate::types::{DataQuality, TimeInForce};

    fn snapshot(venue: &str, bid: Decimal, ask: Decimal) -> UnifiedMarketData {
        UnifiedMarketData {
            venue_id: venue.to_string(),
            symbol: "BTC-USD".to_string(),
            bid,
            ask,
            bid_depth: dec!(100),
            ask_depth: dec!(100),
            spread: ask - bid,
            quality: DataQuality::Realtime,
            last_update: Utc::now(),
        }
    }

    fn buy_order(quantity: Decimal) -> OrderRequest {
        OrderRequest {
            symbol: "BTC-USD".to_string(),
            side: OrderSide::Buy,
            quantity,
            limit_price: None,
            time_in_force: TimeInForce::ImmediateOrCancel,
        }
    }

    #[test]
    fn best_price_picks_lowest_ask_for_buy() {
        let mut snapshots = HashMap::new();
        snapshots.insert("alpha".to_string(), snapshot("alpha", dec!(99), dec!(101)));
        snapshots.insert("beta".to_string(), snapshot("beta", dec!(99), dec!(100.5)));
        let active = vec!["alpha".to_string(), "beta".to_string()];

        let venue = select_venue(
            &buy_order(dec!(1)),
            &snapshots,
            &active,
            &RoutingStrategy::BestPrice,
        )
        .unwrap();
        assert_eq!(venue, "beta");
    }

    #[test]
    fn fixed_venue_requires_active_registration() {
        let mut snapshots = HashMap::new();
        snapshots.insert("alpha".to_string(), snapshot("alpha", dec!(99), dec!(101)));
        let active = vec!["alpha".to_string()];

        let err = select_venue(
            &buy_order(dec!(1)),
            &snapshots,
            &active,
            &RoutingStrategy::FixedVenue("gamma".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, ArbError::NotFound { .. }));
    }
}
