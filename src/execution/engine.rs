//! Dual-leg execution coordinator
//!
//! Dispatches both legs of a validated plan concurrently (fire both, then
//! await both) and reconciles partial outcomes. There is no cross-venue
//! atomicity; a one-sided fill is reported as unhedged exposure.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{RwLock, broadcast};
use tracing::{error, info, warn};
use crate::config::{ArbitrageConfig, PartialFillPolicy};
use crate::errors::{ArbError, ArbResult};
use crate::types::{
    ArbEvent, ArbitrageOpportunity, ExecutionPlan, ExecutionResult, LegResult, OrderLeg,
    OrderRequest, OrderResult, OrderSide, PerformanceMetrics, PlanStatus,
};
use crate::venues::{VenueAggregator, VenueConnector};
use super::metrics::PerformanceTracker;
use super::planner::ExecutionPlanner;

/// Process-wide risk counters, reset daily. Held behind a non-suspending
/// mutex so the capacity gate is check-and-increment atomic.
pub struct RiskCounters {
    inner: parking_lot::Mutex<CounterState>,
}

struct CounterState {
    concurrent: u32,
    daily_volume: Decimal,
    last_reset_day: chrono::NaiveDate,
}

impl RiskCounters {
    fn new() -> Self {
        Self {
            inner: parking_lot::Mutex::new(CounterState {
                concurrent: 0,
                daily_volume: Decimal::ZERO,
                last_reset_day: Utc::now().date_naive(),
            }),
        }
    }

    /// Reserve one concurrency slot, or `None` when at capacity. The slot
    /// releases itself on drop, whatever path the execution takes.
    fn try_acquire(counters: &Arc<RiskCounters>, max: u32) -> Option<ConcurrencySlot> {
        let mut state = counters.inner.lock();
        if state.concurrent >= max {
            return None;
        }
        state.concurrent += 1;
        Some(ConcurrencySlot {
            counters: Arc::clone(counters),
        })
    }

    fn release(&self) {
        let mut state = self.inner.lock();
        state.concurrent = state.concurrent.saturating_sub(1);
    }

    pub fn concurrent(&self) -> u32 {
        self.inner.lock().concurrent
    }

    pub fn daily_volume(&self) -> Decimal {
        self.inner.lock().daily_volume
    }

    pub fn add_daily_volume(&self, notional: Decimal) {
        self.inner.lock().daily_volume += notional;
    }

    /// Zero the daily volume when the calendar day has rolled over.
    pub fn reset_if_new_day(&self) -> bool {
        let today = Utc::now().date_naive();
        let mut state = self.inner.lock();
        if state.last_reset_day != today {
            state.last_reset_day = today;
            state.daily_volume = Decimal::ZERO;
            return true;
        }
        false
    }
}

pub struct ConcurrencySlot {
    counters: Arc<RiskCounters>,
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        self.counters.release();
    }
}

enum LegOutcome {
    Filled(LegResult),
    Failed(String),
}

pub struct ArbitrageCoordinator {
    config: ArbitrageConfig,
    aggregator: Arc<VenueAggregator>,
    planner: ExecutionPlanner,
    counters: Arc<RiskCounters>,
    plans: RwLock<HashMap<String, ExecutionPlan>>,
    tracker: RwLock<PerformanceTracker>,
    events: broadcast::Sender<ArbEvent>,
}

impl ArbitrageCoordinator {
    pub fn new(
        config: ArbitrageConfig,
        aggregator: Arc<VenueAggregator>,
        planner: ExecutionPlanner,
        events: broadcast::Sender<ArbEvent>,
    ) -> Self {
        Self {
            config,
            aggregator,
            planner,
            counters: Arc::new(RiskCounters::new()),
            plans: RwLock::new(HashMap::new()),
            tracker: RwLock::new(PerformanceTracker::new()),
            events,
        }
    }

    pub fn risk_counters(&self) -> &Arc<RiskCounters> {
        &self.counters
    }

    pub fn reset_daily_if_needed(&self) {
        if self.counters.reset_if_new_day() {
            info!("New calendar day, daily volume counter reset");
        }
    }

    /// Execute one opportunity end to end. Pre-dispatch rejections
    /// (disabled, capacity, validation) come back as typed errors before any
    /// order is sent; once legs are dispatched every outcome is folded into
    /// the returned `ExecutionResult`.
    pub async fn execute_arbitrage(
        &self,
        opportunity: &ArbitrageOpportunity,
    ) -> ArbResult<ExecutionResult> {
        if !self.config.auto_execute {
            return Err(ArbError::Capacity {
                reason: "auto-execution is disabled".to_string(),
            });
        }
        self.reset_daily_if_needed();

        // No queuing: the caller retries on a later cycle.
        let _slot = RiskCounters::try_acquire(&self.counters, self.config.max_concurrent_arbitrages)
            .ok_or_else(|| ArbError::Capacity {
                reason: format!(
                    "{} concurrent arbitrages in flight (max {})",
                    self.counters.concurrent(),
                    self.config.max_concurrent_arbitrages
                ),
            })?;

        let started = Instant::now();
        let plan = self
            .planner
            .create_plan(opportunity, self.counters.daily_volume(), Utc::now())?;
        let plan_id = plan.id.clone();
        self.plans.write().await.insert(plan_id.clone(), plan.clone());

        if self.config.pre_trade_validation {
            if let Err(e) = self.planner.validate_plan(&plan, Utc::now()) {
                let mut plans = self.plans.write().await;
                if Utc::now() >= plan.expires_at {
                    if let Some(stored) = plans.get_mut(&plan_id) {
                        stored.status = PlanStatus::Expired;
                    }
                } else {
                    plans.remove(&plan_id);
                }
                return Err(e);
            }
        }

        // Resolve both connectors before committing to dispatch.
        let buy_connector = self.aggregator.registry().connector(&plan.buy_leg.venue_id).await;
        let sell_connector = self.aggregator.registry().connector(&plan.sell_leg.venue_id).await;
        let (buy_connector, sell_connector) = match (buy_connector, sell_connector) {
            (Ok(buy), Ok(sell)) => (buy, sell),
            (Err(e), _) | (_, Err(e)) => {
                self.plans.write().await.remove(&plan_id);
                return Err(e);
            }
        };

        self.set_plan_status(&plan_id, PlanStatus::Executing).await;
        self.counters
            .add_daily_volume(plan.buy_leg.order.quantity * opportunity.buy_price);

        let (buy_outcome, sell_outcome) = tokio::join!(
            self.dispatch_leg(&buy_connector, &plan.buy_leg),
            self.dispatch_leg(&sell_connector, &plan.sell_leg),
        );

        let execution_time_ms = started.elapsed().as_millis() as u64;
        let result = self
            .reconcile(&plan, buy_outcome, sell_outcome, execution_time_ms)
            .await;

        let final_status = if result.success {
            PlanStatus::Completed
        } else {
            PlanStatus::Failed
        };
        self.set_plan_status(&plan_id, final_status).await;

        self.tracker.write().await.record(&result);
        let _ = self.events.send(ArbEvent::ExecutionCompleted {
            result: result.clone(),
        });

        Ok(result)
    }

    async fn dispatch_leg(
        &self,
        connector: &Arc<dyn VenueConnector>,
        leg: &OrderLeg,
    ) -> LegOutcome {
        let outcome = tokio::time::timeout(
            self.config.execution_timeout(),
            connector.place_order(&leg.order),
        )
        .await;

        match outcome {
            Err(_) => LegOutcome::Failed(format!(
                "{} leg timed out after {}ms on {}",
                side_name(leg.order.side),
                self.config.execution_timeout_ms,
                leg.venue_id
            )),
            Ok(Err(e)) => LegOutcome::Failed(format!(
                "{} leg failed on {}: {}",
                side_name(leg.order.side),
                leg.venue_id,
                e
            )),
            Ok(Ok(OrderResult { success: false, error, .. })) => LegOutcome::Failed(format!(
                "{} leg rejected by {}: {}",
                side_name(leg.order.side),
                leg.venue_id,
                error.unwrap_or_else(|| "no reason given".to_string())
            )),
            Ok(Ok(result)) => LegOutcome::Filled(LegResult {
                venue_id: leg.venue_id.clone(),
                order_id: result.order_id,
                execution_price: result
                    .execution_price
                    .or(leg.order.limit_price)
                    .unwrap_or(Decimal::ZERO),
                executed_quantity: result.executed_quantity.unwrap_or(leg.order.quantity),
                fees: result.fees.unwrap_or(leg.estimated_fee),
            }),
        }
    }

    async fn reconcile(
        &self,
        plan: &ExecutionPlan,
        buy_outcome: LegOutcome,
        sell_outcome: LegOutcome,
        execution_time_ms: u64,
    ) -> ExecutionResult {
        let timestamp = Utc::now();
        match (buy_outcome, sell_outcome) {
            (LegOutcome::Filled(buy), LegOutcome::Filled(sell)) => {
                let quantity = buy.executed_quantity.min(sell.executed_quantity);
                let realized_spread = sell.execution_price - buy.execution_price;
                let total_fees = buy.fees + sell.fees;
                let realized_profit = realized_spread * quantity - total_fees;
                let deployed = buy.execution_price * quantity;
                let realized_profit_percent = if deployed > Decimal::ZERO {
                    realized_profit / deployed * Decimal::ONE_HUNDRED
                } else {
                    Decimal::ZERO
                };
                // Slippage on each leg, combined; positive means fills were
                // worse than the quoted opportunity.
                let slippage = (buy.execution_price - plan.opportunity.buy_price)
                    + (plan.opportunity.sell_price - sell.execution_price);

                let timing_score = timing_score(execution_time_ms, self.config.max_latency_ms);
                let execution_efficiency = 0.5 * timing_score
                    + if realized_profit > Decimal::ZERO { 0.5 } else { 0.0 };
                let risk_adjusted_return = if plan.risk_score > 0 {
                    realized_profit_percent
                        / (Decimal::from(plan.risk_score) / Decimal::ONE_HUNDRED)
                } else {
                    realized_profit_percent
                };

                if self.config.post_trade_reconciliation {
                    let planned = plan.buy_leg.order.quantity;
                    if quantity < planned {
                        warn!(
                            plan_id = %plan.id,
                            "IOC legs under-filled: planned {}, matched {}",
                            planned,
                            quantity
                        );
                    }
                }

                info!(
                    plan_id = %plan.id,
                    profit = %realized_profit,
                    slippage = %slippage,
                    "Arbitrage completed in {}ms",
                    execution_time_ms
                );

                ExecutionResult {
                    plan_id: plan.id.clone(),
                    opportunity_id: plan.opportunity.id.clone(),
                    success: true,
                    realized_profit,
                    realized_profit_percent,
                    total_fees,
                    slippage,
                    execution_efficiency,
                    timing_score,
                    risk_adjusted_return,
                    execution_time_ms,
                    buy_result: Some(buy),
                    sell_result: Some(sell),
                    error: None,
                    timestamp,
                }
            }
            (buy_outcome, sell_outcome) => {
                let (buy_result, buy_error) = split(buy_outcome);
                let (sell_result, sell_error) = split(sell_outcome);
                let errors: Vec<String> = [buy_error, sell_error].into_iter().flatten().collect();

                // One-sided fills leave exposure that is NOT automatically
                // unwound unless the policy says so.
                let filled = match (&buy_result, &sell_result) {
                    (Some(leg), None) => Some((leg.clone(), OrderSide::Buy)),
                    (None, Some(leg)) => Some((leg.clone(), OrderSide::Sell)),
                    _ => None,
                };
                if let Some((leg, side)) = filled {
                    warn!(
                        plan_id = %plan.id,
                        venue = %leg.venue_id,
                        quantity = %leg.executed_quantity,
                        "One-sided fill: unhedged exposure is not automatically unwound"
                    );
                    let _ = self.events.send(ArbEvent::UnhedgedExposure {
                        plan_id: plan.id.clone(),
                        venue_id: leg.venue_id.clone(),
                        side,
                        quantity: leg.executed_quantity,
                    });
                    if self.config.partial_fill_policy == PartialFillPolicy::Unwind {
                        self.attempt_unwind(plan, &leg, side).await;
                    }
                }

                let total_fees = buy_result.as_ref().map(|l| l.fees).unwrap_or(Decimal::ZERO)
                    + sell_result.as_ref().map(|l| l.fees).unwrap_or(Decimal::ZERO);

                ExecutionResult {
                    plan_id: plan.id.clone(),
                    opportunity_id: plan.opportunity.id.clone(),
                    success: false,
                    realized_profit: Decimal::ZERO,
                    realized_profit_percent: Decimal::ZERO,
                    total_fees,
                    slippage: Decimal::ZERO,
                    execution_efficiency: 0.0,
                    timing_score: timing_score(execution_time_ms, self.config.max_latency_ms),
                    risk_adjusted_return: Decimal::ZERO,
                    execution_time_ms,
                    buy_result,
                    sell_result,
                    error: Some(errors.join("; ")),
                    timestamp,
                }
            }
        }
    }

    /// Best-effort reverse IOC order on the filled leg. Failure here is
    /// logged and alerted, never retried: the book stays exposed and the
    /// operator decides.
    async fn attempt_unwind(&self, plan: &ExecutionPlan, leg: &LegResult, side: OrderSide) {
        let reverse_side = match side {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        };
        let order = OrderRequest::ioc(
            &plan.opportunity.symbol,
            reverse_side,
            leg.executed_quantity,
            leg.execution_price,
        );

        let connector = match self.aggregator.registry().connector(&leg.venue_id).await {
            Ok(connector) => connector,
            Err(e) => {
                error!("Cannot unwind on {}: {}", leg.venue_id, e);
                return;
            }
        };

        match tokio::time::timeout(self.config.execution_timeout(), connector.place_order(&order))
            .await
        {
            Ok(Ok(result)) if result.success => {
                info!(
                    plan_id = %plan.id,
                    venue = %leg.venue_id,
                    "Unwound one-sided fill of {}",
                    leg.executed_quantity
                );
            }
            Ok(Ok(result)) => {
                error!(
                    "Unwind order rejected on {}: {}",
                    leg.venue_id,
                    result.error.unwrap_or_else(|| "no reason given".to_string())
                );
            }
            Ok(Err(e)) => error!("Unwind order failed on {}: {}", leg.venue_id, e),
            Err(_) => error!("Unwind order timed out on {}", leg.venue_id),
        }
    }

    async fn set_plan_status(&self, plan_id: &str, status: PlanStatus) {
        if let Some(plan) = self.plans.write().await.get_mut(plan_id) {
            plan.status = status;
        }
    }

    pub async fn plan(&self, plan_id: &str) -> Option<ExecutionPlan> {
        self.plans.read().await.get(plan_id).cloned()
    }

    pub async fn executing_count(&self) -> usize {
        self.plans
            .read()
            .await
            .values()
            .filter(|p| p.status == PlanStatus::Executing)
            .count()
    }

    /// Expire overdue pending plans and drop expired non-executing ones.
    /// Returns how many were removed.
    pub async fn prune_plans(&self) -> usize {
        let now = Utc::now();
        let mut plans = self.plans.write().await;
        for plan in plans.values_mut() {
            if plan.status == PlanStatus::Pending && now >= plan.expires_at {
                plan.status = PlanStatus::Expired;
            }
        }
        let before = plans.len();
        plans.retain(|_, plan| plan.status == PlanStatus::Executing || now < plan.expires_at);
        before - plans.len()
    }

    pub async fn recent_results(&self, limit: usize) -> Vec<ExecutionResult> {
        let tracker = self.tracker.read().await;
        tracker.history().rev().take(limit).cloned().collect()
    }

    pub async fn metrics_snapshot(&self) -> PerformanceMetrics {
        self.tracker.read().await.snapshot()
    }

    pub async fn clear(&self) {
        self.plans.write().await.clear();
        self.tracker.write().await.clear();
    }
}

fn timing_score(execution_time_ms: u64, max_latency_ms: u64) -> f64 {
    if max_latency_ms == 0 {
        return 0.0;
    }
    let ratio = execution_time_ms.to_f64().unwrap_or(f64::MAX) / max_latency_ms as f64;
    (1.0 - ratio).max(0.0)
}

fn side_name(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    }
}

fn split(outcome: LegOutcome) -> (Option<LegResult>, Option<String>) {
    match outcome {
        LegOutcome::Filled(leg) => (Some(leg), None),
        LegOutcome::Failed(error) => (None, Some(error)),
    }
}
