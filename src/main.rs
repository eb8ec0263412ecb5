//! Cross-Venue Arbitrage Bot - Main Entry Point
//!
//! Runs the engine against simulated venues so the full pipeline (aggregation,
//! detection, planning, dual-leg execution) can be exercised without live
//! venue credentials.

use anyhow::Result;
use cross_arb_bot::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use crate::venues::{SimulatedVenue, VenueConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    let _logging_guard = utils::setup_logging()?;
    utils::setup_output_directories()?;

    // Load configuration
    let config = CONFIG.clone();

    info!("🔀 Cross-Venue Arbitrage Bot v0.5.0");
    info!("📋 Configuration:");
    info!("   Symbols: {:?}", config.symbols);
    info!("   Min profit threshold: {}%", config.min_profit_threshold);
    info!("   Max concurrent arbitrages: {}", config.max_concurrent_arbitrages);
    info!("   Max daily volume: {}", config.max_daily_volume);
    info!("   Risk budget per trade: {}", config.risk_budget_per_trade);
    info!("   Auto-execute: {}", config.auto_execute);
    info!("   Partial fill policy: {:?}", config.partial_fill_policy);

    let engine = Arc::new(ArbitrageEngine::new(config.clone()));

    // Demo venues: persistent small price discrepancies between them
    register_demo_venues(&engine, &config).await?;

    // Surface engine events on the console
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ArbEvent::HighValueOpportunity { opportunity } => {
                    utils::print_opportunity(&opportunity);
                }
                ArbEvent::UnhedgedExposure { plan_id, venue_id, quantity, .. } => {
                    warn!("⚠️  Unhedged exposure: plan {} left {} on {}", plan_id, quantity, venue_id);
                }
                ArbEvent::DataError { venue_id, message, .. } => {
                    warn!("Data error from {}: {}", venue_id, message);
                }
                _ => {}
            }
        }
    });

    let start_time = Instant::now();
    engine.start();

    info!("\n🚀 Engine running, Ctrl+C to stop\n");
    tokio::signal::ctrl_c().await?;
    info!("\n📛 Received shutdown signal (Ctrl+C)...");

    let metrics = engine.coordinator().metrics_snapshot().await;
    let pool = engine.aggregator().registry().pool_summary().await;
    engine.shutdown().await;

    utils::print_session_stats(start_time, &metrics, &pool);
    Ok(())
}

async fn register_demo_venues(
    engine: &Arc<ArbitrageEngine>,
    config: &ArbitrageConfig,
) -> Result<()> {
    let mut venues = Vec::new();

    let alpha = SimulatedVenue::new("alpha").with_latency(Duration::from_millis(40));
    let beta = SimulatedVenue::new("beta")
        .with_latency(Duration::from_millis(80))
        .with_fill_slippage_bps(5);

    for symbol in &config.symbols {
        // Give beta a standing premium so detection has something to find
        venues.push((symbol.clone(), dec!(25000), dec!(25060)));
    }

    let alpha = Arc::new(seed_quotes(alpha, &venues, dec!(0)));
    let beta = Arc::new(seed_quotes(beta, &venues, dec!(200)));

    engine
        .register_venue(
            "alpha",
            alpha,
            VenueConfig {
                taker_fee_percent: dec!(0.1),
                avg_latency_ms: 40,
                ..VenueConfig::default()
            },
        )
        .await?;
    engine
        .register_venue(
            "beta",
            beta,
            VenueConfig {
                taker_fee_percent: dec!(0.1),
                avg_latency_ms: 80,
                ..VenueConfig::default()
            },
        )
        .await?;

    info!("✅ Registered simulated venues alpha and beta");
    Ok(())
}

fn seed_quotes(
    mut venue: SimulatedVenue,
    quotes: &[(String, rust_decimal::Decimal, rust_decimal::Decimal)],
    offset: rust_decimal::Decimal,
) -> SimulatedVenue {
    for (symbol, bid, ask) in quotes {
        venue = venue.with_quote(symbol, bid + offset, ask + offset, dec!(6000), dec!(6000));
    }
    venue
}
