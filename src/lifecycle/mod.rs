//! Engine assembly and lifecycle loops
//!
//! Owns the scan / performance / cleanup / health timers and the shutdown
//! sequence. Loops interleave cooperatively; stale work is cancelled by
//! `expires_at` re-checks, never by forceful abort of in-flight venue calls.

use futures_util::future::join_all;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use crate::arbitrage::{OpportunityDetector, VenueFeeTable, VenueLatencyTable};
use crate::config::{ArbitrageConfig, CLEANUP_INTERVAL_SECS};
use crate::errors::{ArbResult, CircuitBreaker};
use crate::execution::{ArbitrageCoordinator, ExecutionPlanner};
use crate::storage;
use crate::types::{ArbEvent, ArbitrageOpportunity, OpportunityQuality};
use crate::utils::display;
use crate::venues::{VenueAggregator, VenueConfig, VenueConnector};

/// How many of the best detections one scan cycle may execute.
const MAX_AUTO_EXECUTIONS_PER_SCAN: usize = 3;
/// Minimum confidence for auto-execution candidates.
const AUTO_EXECUTE_MIN_CONFIDENCE: f64 = 0.8;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Cheap to clone: every piece of state is shared, so loop tasks hold
/// their own handle to the same engine.
#[derive(Clone)]
pub struct ArbitrageEngine {
    config: ArbitrageConfig,
    aggregator: Arc<VenueAggregator>,
    detector: Arc<OpportunityDetector>,
    coordinator: Arc<ArbitrageCoordinator>,
    fee_model: Arc<VenueFeeTable>,
    latency_model: Arc<VenueLatencyTable>,
    breaker: Arc<CircuitBreaker>,
    events: broadcast::Sender<ArbEvent>,
    shutdown: Arc<watch::Sender<bool>>,
    tasks: Arc<parking_lot::Mutex<Vec<JoinHandle<()>>>>,
}

impl ArbitrageEngine {
    pub fn new(config: ArbitrageConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        let shutdown = Arc::new(shutdown);

        let aggregator = Arc::new(VenueAggregator::new(config.clone(), events.clone()));
        let fee_model = Arc::new(VenueFeeTable::new(dec!(0.1)));
        let latency_model = Arc::new(VenueLatencyTable::new(150));

        let detector = Arc::new(OpportunityDetector::new(
            config.clone(),
            Arc::clone(&aggregator),
            fee_model.clone(),
            latency_model.clone(),
            events.clone(),
        ));

        let planner = ExecutionPlanner::new(config.clone(), fee_model.clone());
        let coordinator = Arc::new(ArbitrageCoordinator::new(
            config.clone(),
            Arc::clone(&aggregator),
            planner,
            events.clone(),
        ));

        let breaker = Arc::new(CircuitBreaker::new(
            config.max_consecutive_errors,
            config.circuit_breaker_cooldown_secs,
        ));

        Self {
            config,
            aggregator,
            detector,
            coordinator,
            fee_model,
            latency_model,
            breaker,
            events,
            shutdown,
            tasks: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> &ArbitrageConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &Arc<VenueAggregator> {
        &self.aggregator
    }

    pub fn detector(&self) -> &Arc<OpportunityDetector> {
        &self.detector
    }

    pub fn coordinator(&self) -> &Arc<ArbitrageCoordinator> {
        &self.coordinator
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ArbEvent> {
        self.events.subscribe()
    }

    /// Register a venue and feed its static config into the fee and latency
    /// tables the detector prices candidates with.
    pub async fn register_venue(
        &self,
        venue_id: &str,
        connector: Arc<dyn VenueConnector>,
        venue_config: VenueConfig,
    ) -> ArbResult<()> {
        self.fee_model
            .set_rate(venue_id, venue_config.taker_fee_percent);
        self.latency_model
            .set_latency(venue_id, venue_config.avg_latency_ms);
        self.aggregator
            .register(venue_id, connector, venue_config)
            .await
    }

    pub async fn unregister_venue(&self, venue_id: &str) -> ArbResult<()> {
        self.aggregator.unregister(venue_id).await?;
        self.fee_model.remove(venue_id);
        self.latency_model.remove(venue_id);
        Ok(())
    }

    /// Spawn the scan, performance, cleanup and health loops.
    pub fn start(&self) {
        self.coordinator.reset_daily_if_needed();

        let mut tasks = self.tasks.lock();

        let engine = self.clone();
        let mut rx = self.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.config.price_update_interval());
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = engine.scan_cycle().await {
                            error!("Scan cycle error: {}", e);
                            if engine.breaker.record_error().await {
                                error!("Circuit breaker activated, scanning paused");
                            }
                        }
                    }
                    _ = rx.changed() => break,
                }
            }
        }));

        let engine = self.clone();
        let mut rx = self.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(
                engine.config.performance_review_interval_ms,
            ));
            loop {
                tokio::select! {
                    _ = interval.tick() => engine.performance_cycle().await,
                    _ = rx.changed() => break,
                }
            }
        }));

        let engine = self.clone();
        let mut rx = self.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            loop {
                tokio::select! {
                    _ = interval.tick() => engine.cleanup_cycle().await,
                    _ = rx.changed() => break,
                }
            }
        }));

        let engine = self.clone();
        let mut rx = self.shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(engine.config.health_check_interval());
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        engine.aggregator.registry().run_health_checks().await;
                    }
                    _ = rx.changed() => break,
                }
            }
        }));

        info!(
            "Arbitrage engine started: {} symbols, scan every {}ms, auto-execute {}",
            self.config.symbols.len(),
            self.config.price_update_interval_ms,
            self.config.auto_execute
        );
    }

    /// One detection pass over the configured universe, executing the best
    /// detections when auto-execution is on. Individual execution failures
    /// are reported and swallowed; the loop keeps running.
    pub async fn scan_cycle(&self) -> anyhow::Result<()> {
        self.coordinator.reset_daily_if_needed();

        if !self.breaker.can_proceed().await {
            warn!("Circuit breaker is OPEN, skipping scan cycle");
            return Ok(());
        }

        let opportunities = self.detector.detect(&self.config.symbols).await;

        for opportunity in &opportunities {
            if let Err(e) = storage::save_opportunity(opportunity) {
                debug!("Could not persist opportunity: {}", e);
            }
        }

        if self.config.auto_execute && !opportunities.is_empty() {
            self.auto_execute(&opportunities).await;
        }

        self.breaker.record_success().await;
        Ok(())
    }

    async fn auto_execute(&self, opportunities: &[ArbitrageOpportunity]) {
        let candidates: Vec<&ArbitrageOpportunity> = opportunities
            .iter()
            .filter(|o| {
                o.quality == OpportunityQuality::Excellent
                    && o.confidence > AUTO_EXECUTE_MIN_CONFIDENCE
            })
            .take(MAX_AUTO_EXECUTIONS_PER_SCAN)
            .collect();

        if candidates.is_empty() {
            return;
        }
        info!("Auto-executing {} opportunities", candidates.len());

        let attempts = candidates
            .into_iter()
            .map(|opportunity| async move {
                let outcome = self.coordinator.execute_arbitrage(opportunity).await;
                (opportunity.id.clone(), outcome)
            });

        for (opportunity_id, outcome) in join_all(attempts).await {
            match outcome {
                Ok(result) => {
                    display::print_execution_result(&result);
                    if let Err(e) = storage::save_execution_result(&result) {
                        debug!("Could not persist execution result: {}", e);
                    }
                }
                Err(e) => warn!("Auto-execution of {} rejected: {}", opportunity_id, e),
            }
        }
    }

    async fn performance_cycle(&self) {
        let metrics = self.coordinator.metrics_snapshot().await;
        display::print_performance(&metrics);
        let _ = self.events.send(ArbEvent::PerformanceSnapshot { metrics });
    }

    /// Drop expired opportunities and plans, and tag stale cache entries.
    /// Running it again with no new data removes nothing further.
    pub async fn cleanup_cycle(&self) {
        let opportunities = self.detector.prune_expired().await;
        let plans = self.coordinator.prune_plans().await;
        let stale = self.aggregator.mark_stale_entries().await;
        if opportunities + plans + stale > 0 {
            debug!(
                "Cleanup: {} opportunities dropped, {} plans dropped, {} cache entries stale",
                opportunities, plans, stale
            );
        }
    }

    /// Stop all loops, wait (bounded) for in-flight plans to settle, then
    /// clear in-memory state.
    pub async fn shutdown(&self) {
        info!("Shutting down arbitrage engine...");
        let _ = self.shutdown.send(true);

        let deadline = tokio::time::Instant::now() + self.config.execution_timeout();
        while self.coordinator.executing_count().await > 0
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
        let still_executing = self.coordinator.executing_count().await;
        if still_executing > 0 {
            warn!("{} plans still executing at shutdown deadline", still_executing);
        }

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in &tasks {
            task.abort();
        }

        self.aggregator.clear_caches().await;
        self.aggregator.registry().clear().await;
        self.detector.clear().await;
        self.coordinator.clear().await;
        info!("Arbitrage engine stopped");
    }
}
