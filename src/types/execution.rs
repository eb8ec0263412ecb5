//! Execution plan and result types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::{ArbitrageOpportunity, OrderRequest};

/// Plan lifecycle: `Pending -> Executing -> {Completed | Failed}`, with
/// `Expired` reachable from `Pending` when validation runs past `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    Expired,
}

/// One side of a two-legged plan, bound to a specific venue.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLeg {
    pub venue_id: String,
    pub order: OrderRequest,
    pub estimated_fee: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub id: String,
    pub opportunity: ArbitrageOpportunity,
    pub buy_leg: OrderLeg,
    pub sell_leg: OrderLeg,
    pub risk_score: u32,
    pub risk_factors: Vec<String>,
    pub max_loss: Decimal,
    pub expected_profit: Decimal,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: PlanStatus,
}

/// Fill details for one successfully executed leg.
#[derive(Debug, Clone, Serialize)]
pub struct LegResult {
    pub venue_id: String,
    pub order_id: Option<String>,
    pub execution_price: Decimal,
    pub executed_quantity: Decimal,
    pub fees: Decimal,
}

/// Final outcome of one arbitrage attempt. Appended to a bounded history.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub plan_id: String,
    pub opportunity_id: String,
    pub success: bool,
    pub realized_profit: Decimal,
    pub realized_profit_percent: Decimal,
    pub total_fees: Decimal,
    pub slippage: Decimal,
    /// Blend of latency headroom and profitability, 0.0-1.0.
    pub execution_efficiency: f64,
    /// 1 - execution_time / max_latency, floored at 0.
    pub timing_score: f64,
    pub risk_adjusted_return: Decimal,
    pub execution_time_ms: u64,
    pub buy_result: Option<LegResult>,
    pub sell_result: Option<LegResult>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Running aggregates over the execution history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub success_rate: f64,
    pub total_profit: Decimal,
    pub average_profit: Decimal,
    pub total_fees: Decimal,
    pub net_profit: Decimal,
    pub total_volume: Decimal,
    /// Net profit over cumulative deployed volume, percent.
    pub roi_percent: Decimal,
}
