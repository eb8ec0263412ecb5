//! Lifecycle tests: scan cycle auto-execution, cleanup, shutdown.

mod support;

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use cross_arb_bot::config::ArbitrageConfig;
use cross_arb_bot::lifecycle::ArbitrageEngine;
use cross_arb_bot::types::{ArbEvent, OpportunityQuality};
use support::{quoted_venue, register, test_config};

/// A wide, deep, realtime spread: excellent quality and full confidence, so
/// the scan cycle executes it without operator involvement.
async fn engine_with_excellent_spread(config: ArbitrageConfig) -> Arc<ArbitrageEngine> {
    let engine = Arc::new(ArbitrageEngine::new(config));
    register(
        &engine,
        "alpha",
        quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.00), dec!(1500)),
        40,
    )
    .await;
    register(
        &engine,
        "beta",
        quoted_venue("beta", "BTC-USD", dec!(101.50), dec!(101.55), dec!(1500)),
        40,
    )
    .await;
    engine
}

#[tokio::test]
async fn scan_cycle_detects_and_auto_executes_top_opportunities() {
    let engine = engine_with_excellent_spread(test_config()).await;

    engine.scan_cycle().await.unwrap();

    let active = engine.detector().active_opportunities().await;
    assert!(!active.is_empty());
    assert_eq!(active[0].quality, OpportunityQuality::Excellent);
    assert!(active[0].confidence > 0.8);

    let metrics = engine.coordinator().metrics_snapshot().await;
    assert_eq!(metrics.total_executions, 1);
    assert_eq!(metrics.successful_executions, 1);
}

#[tokio::test]
async fn scan_cycle_without_auto_execute_only_detects() {
    let config = ArbitrageConfig {
        auto_execute: false,
        ..test_config()
    };
    let engine = engine_with_excellent_spread(config).await;

    engine.scan_cycle().await.unwrap();

    assert!(!engine.detector().active_opportunities().await.is_empty());
    let metrics = engine.coordinator().metrics_snapshot().await;
    assert_eq!(metrics.total_executions, 0);
}

/// A failing execution does not break the scan loop: the cycle completes
/// and reports the attempt in its metrics.
#[tokio::test]
async fn scan_cycle_swallows_individual_execution_failures() {
    let engine = Arc::new(ArbitrageEngine::new(test_config()));
    register(
        &engine,
        "alpha",
        quoted_venue("alpha", "BTC-USD", dec!(99.95), dec!(100.00), dec!(1500)),
        40,
    )
    .await;
    let beta = Arc::new(quoted_venue("beta", "BTC-USD", dec!(101.50), dec!(101.55), dec!(1500)));
    engine
        .register_venue("beta", beta.clone(), cross_arb_bot::venues::VenueConfig::default())
        .await
        .unwrap();
    beta.set_reject_orders(true);

    engine.scan_cycle().await.unwrap();

    let metrics = engine.coordinator().metrics_snapshot().await;
    assert_eq!(metrics.total_executions, 1);
    assert_eq!(metrics.successful_executions, 0);
}

#[tokio::test]
async fn cleanup_cycle_is_idempotent_with_no_new_data() {
    let config = ArbitrageConfig {
        opportunity_expiry_ms: 50,
        auto_execute: false,
        ..test_config()
    };
    let engine = engine_with_excellent_spread(config).await;

    engine.scan_cycle().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    engine.cleanup_cycle().await;
    let after_first = engine.detector().active_opportunities().await.len();
    assert_eq!(after_first, 0);

    // Second run with no new data removes nothing further.
    let removed = engine.detector().prune_expired().await
        + engine.coordinator().prune_plans().await
        + engine.aggregator().mark_stale_entries().await;
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn started_engine_emits_performance_snapshots() {
    let config = ArbitrageConfig {
        performance_review_interval_ms: 100,
        auto_execute: false,
        symbols: vec!["BTC-USD".to_string()],
        ..test_config()
    };
    let engine = engine_with_excellent_spread(config).await;
    let mut events = engine.subscribe();

    engine.start();

    let snapshot = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            if let Ok(ArbEvent::PerformanceSnapshot { metrics }) = events.recv().await {
                return metrics;
            }
        }
    })
    .await
    .expect("performance snapshot within the review interval");
    assert_eq!(snapshot.total_executions, 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_loops_and_clears_state() {
    let config = ArbitrageConfig {
        symbols: vec!["BTC-USD".to_string()],
        ..test_config()
    };
    let engine = engine_with_excellent_spread(config).await;

    engine.start();
    // Let at least one scan land.
    tokio::time::sleep(Duration::from_millis(400)).await;

    engine.shutdown().await;

    assert!(engine.detector().active_opportunities().await.is_empty());
    assert_eq!(engine.coordinator().executing_count().await, 0);
    assert!(engine.aggregator().registry().is_empty().await);
    let snapshots = engine.aggregator().aggregated_market_data("BTC-USD").await.unwrap();
    assert!(snapshots.is_empty());
}
