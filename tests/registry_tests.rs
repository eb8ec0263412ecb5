//! Registry and aggregation tests: lifecycle errors, settle-all fan-out,
//! routing, portfolio aggregation, health gating.

mod support;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use cross_arb_bot::config::ArbitrageConfig;
use cross_arb_bot::errors::ArbError;
use cross_arb_bot::lifecycle::ArbitrageEngine;
use cross_arb_bot::types::{ArbEvent, OrderRequest, OrderSide, VenueEvent};
use cross_arb_bot::venues::{RoutingStrategy, SimulatedVenue, VenueConfig};
use support::{quoted_venue, register, test_config};

#[tokio::test]
async fn registering_past_capacity_fails() {
    let config = ArbitrageConfig {
        max_venues: 1,
        ..test_config()
    };
    let engine = ArbitrageEngine::new(config);
    register(&engine, "alpha", SimulatedVenue::new("alpha"), 40).await;

    let err = engine
        .register_venue(
            "beta",
            Arc::new(SimulatedVenue::new("beta")),
            VenueConfig::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ArbError::Capacity { .. }));
}

#[tokio::test]
async fn registering_the_same_venue_twice_fails() {
    let engine = ArbitrageEngine::new(test_config());
    register(&engine, "alpha", SimulatedVenue::new("alpha"), 40).await;

    let err = engine
        .register_venue(
            "alpha",
            Arc::new(SimulatedVenue::new("alpha")),
            VenueConfig::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ArbError::Duplicate { .. }));
}

#[tokio::test]
async fn unregistering_an_unknown_venue_fails() {
    let engine = ArbitrageEngine::new(test_config());
    let err = engine.unregister_venue("ghost").await.unwrap_err();
    assert!(matches!(err, ArbError::NotFound { .. }));
}

#[tokio::test]
async fn registration_updates_pool_summary_and_emits_events() {
    let engine = ArbitrageEngine::new(test_config());
    let mut events = engine.subscribe();

    register(&engine, "alpha", SimulatedVenue::new("alpha"), 40).await;
    register(&engine, "beta", SimulatedVenue::new("beta"), 40).await;

    let summary = engine.aggregator().registry().pool_summary().await;
    assert_eq!(summary.total_venues, 2);
    assert_eq!(summary.healthy_venues, 2);
    assert!((summary.health_ratio - 1.0).abs() < f64::EPSILON);
    assert!(summary.per_venue.contains_key("alpha"));

    let mut registered = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ArbEvent::VenueRegistered { .. }) {
            registered += 1;
        }
    }
    assert_eq!(registered, 2);

    engine.unregister_venue("alpha").await.unwrap();
    let summary = engine.aggregator().registry().pool_summary().await;
    assert_eq!(summary.total_venues, 1);
}

/// One venue fails its market-data request: the other venue's snapshot is
/// still returned, and the failure surfaces as a `DataError` event.
#[tokio::test]
async fn failing_venue_does_not_abort_aggregation() {
    let engine = Arc::new(ArbitrageEngine::new(test_config()));
    register(
        &engine,
        "alpha",
        quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.00), dec!(500)),
        40,
    )
    .await;
    let beta = Arc::new(quoted_venue("beta", "BTC-USD", dec!(101.00), dec!(101.05), dec!(500)));
    engine
        .register_venue("beta", beta.clone(), VenueConfig::default())
        .await
        .unwrap();
    beta.set_fail_data(true);

    let mut events = engine.subscribe();
    let snapshots = engine
        .aggregator()
        .aggregated_market_data("BTC-USD")
        .await
        .unwrap();

    assert_eq!(snapshots.len(), 1);
    assert!(snapshots.contains_key("alpha"));

    let mut saw_data_error = false;
    while let Ok(event) = events.try_recv() {
        if let ArbEvent::DataError { venue_id, .. } = event {
            assert_eq!(venue_id, "beta");
            saw_data_error = true;
        }
    }
    assert!(saw_data_error);
}

#[tokio::test]
async fn aggregated_data_is_cached_within_the_poll_interval() {
    let config = ArbitrageConfig {
        price_update_interval_ms: 60_000,
        ..test_config()
    };
    let engine = Arc::new(ArbitrageEngine::new(config));
    let alpha = Arc::new(quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.00), dec!(500)));
    engine
        .register_venue("alpha", alpha.clone(), VenueConfig::default())
        .await
        .unwrap();

    let first = engine.aggregator().aggregated_market_data("BTC-USD").await.unwrap();
    assert_eq!(first.len(), 1);

    // The quote moves, but the cached snapshot is served until it ages out.
    alpha
        .set_quote("BTC-USD", dec!(150.00), dec!(150.05), dec!(500), dec!(500))
        .await;
    let second = engine.aggregator().aggregated_market_data("BTC-USD").await.unwrap();
    assert_eq!(second["alpha"].ask, dec!(100.00));
}

#[tokio::test]
async fn unregistering_purges_cached_venue_data() {
    let engine = Arc::new(ArbitrageEngine::new(test_config()));
    register(
        &engine,
        "alpha",
        quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.00), dec!(500)),
        40,
    )
    .await;
    register(
        &engine,
        "beta",
        quoted_venue("beta", "BTC-USD", dec!(101.00), dec!(101.05), dec!(500)),
        40,
    )
    .await;

    let snapshots = engine.aggregator().aggregated_market_data("BTC-USD").await.unwrap();
    assert_eq!(snapshots.len(), 2);

    engine.unregister_venue("beta").await.unwrap();
    // Served from cache, minus the purged venue.
    let snapshots = engine.aggregator().aggregated_market_data("BTC-USD").await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert!(!snapshots.contains_key("beta"));
}

#[tokio::test]
async fn best_price_routing_forwards_to_the_cheapest_ask() {
    let engine = Arc::new(ArbitrageEngine::new(test_config()));
    register(
        &engine,
        "alpha",
        quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.50), dec!(500)),
        40,
    )
    .await;
    register(
        &engine,
        "beta",
        quoted_venue("beta", "BTC-USD", dec!(99.95), dec!(100.20), dec!(500)),
        40,
    )
    .await;

    let mut events = engine.subscribe();
    let order = OrderRequest::ioc("BTC-USD", OrderSide::Buy, dec!(5), dec!(100.50));
    let result = engine
        .aggregator()
        .execute_order(&order, &RoutingStrategy::BestPrice)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.execution_price, Some(dec!(100.20)));

    let mut executed_on = None;
    while let Ok(event) = events.try_recv() {
        if let ArbEvent::Venue(VenueEvent::OrderExecuted { venue_id, .. }) = event {
            executed_on = Some(venue_id);
        }
    }
    assert_eq!(executed_on.as_deref(), Some("beta"));
}

#[tokio::test]
async fn order_failure_propagates_tagged_with_the_venue() {
    let engine = Arc::new(ArbitrageEngine::new(test_config()));
    let alpha = Arc::new(quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.00), dec!(500)));
    engine
        .register_venue("alpha", alpha.clone(), VenueConfig::default())
        .await
        .unwrap();
    alpha.set_reject_orders(true);

    let order = OrderRequest::ioc("BTC-USD", OrderSide::Buy, dec!(5), dec!(100.00));
    let err = engine
        .aggregator()
        .execute_order(&order, &RoutingStrategy::FixedVenue("alpha".to_string()))
        .await
        .unwrap_err();
    match err {
        ArbError::Execution { venue_id, .. } => assert_eq!(venue_id, "alpha"),
        other => panic!("expected Execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn portfolio_aggregates_balances_across_venues() {
    let engine = Arc::new(ArbitrageEngine::new(test_config()));
    register(
        &engine,
        "alpha",
        SimulatedVenue::new("alpha")
            .with_balance("BTC", dec!(2), dec!(60000))
            .with_balance("USDT", dec!(20000), dec!(20000)),
        40,
    )
    .await;
    register(
        &engine,
        "beta",
        SimulatedVenue::new("beta").with_balance("BTC", dec!(1), dec!(20000)),
        40,
    )
    .await;

    let portfolio = engine.aggregator().cross_venue_portfolio(true).await.unwrap();
    assert_eq!(portfolio.total_value, dec!(100000));

    let btc = portfolio.assets.iter().find(|a| a.asset == "BTC").unwrap();
    assert_eq!(btc.total, dec!(3));
    assert_eq!(btc.usd_value, dec!(80000));
    assert_eq!(btc.allocation_percent, dec!(80));
    // BTC dominates the book, alpha dominates the venues.
    assert_eq!(portfolio.concentration_risk, dec!(80));
    assert_eq!(portfolio.venue_risk, dec!(80));

    let total_allocation: Decimal = portfolio
        .assets
        .iter()
        .map(|a| a.allocation_percent)
        .sum();
    assert_eq!(total_allocation, dec!(100));
}

#[tokio::test]
async fn disconnected_venue_is_removed_from_rotation() {
    let engine = Arc::new(ArbitrageEngine::new(test_config()));
    let alpha = Arc::new(quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.00), dec!(500)));
    engine
        .register_venue("alpha", alpha.clone(), VenueConfig::default())
        .await
        .unwrap();

    alpha.disconnect().await;
    engine.aggregator().registry().run_health_checks().await;

    let summary = engine.aggregator().registry().pool_summary().await;
    assert_eq!(summary.healthy_venues, 0);
    assert!(engine.aggregator().registry().active_ids().await.is_empty());

    // Inactive venues no longer participate in aggregation.
    engine.aggregator().clear_caches().await;
    let snapshots = engine.aggregator().aggregated_market_data("BTC-USD").await.unwrap();
    assert!(snapshots.is_empty());
}
