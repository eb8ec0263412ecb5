//! Execution plan construction and pre-trade validation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use crate::arbitrage::FeeModel;
use crate::config::ArbitrageConfig;
use crate::errors::{ArbError, ArbResult};
use crate::types::{
    ArbitrageOpportunity, ExecutionPlan, OrderLeg, OrderRequest, OrderSide, PlanStatus, RiskLevel,
};

/// Slippage buffer folded into `max_loss`, fraction of notional.
const SLIPPAGE_BUFFER: Decimal = dec!(0.01);

pub struct ExecutionPlanner {
    config: ArbitrageConfig,
    fee_model: Arc<dyn FeeModel>,
}

impl ExecutionPlanner {
    pub fn new(config: ArbitrageConfig, fee_model: Arc<dyn FeeModel>) -> Self {
        Self { config, fee_model }
    }

    /// Size the trade from the opportunity, the position cap and the daily
    /// volume headroom, discounted by risk, then build both IOC legs.
    pub fn create_plan(
        &self,
        opportunity: &ArbitrageOpportunity,
        daily_volume: Decimal,
        now: DateTime<Utc>,
    ) -> ArbResult<ExecutionPlan> {
        let buy_price = opportunity.buy_price;
        if buy_price <= Decimal::ZERO {
            return Err(ArbError::Validation {
                reason: "opportunity has a non-positive buy price".to_string(),
            });
        }

        let daily_headroom =
            (self.config.max_daily_volume - daily_volume).max(Decimal::ZERO) / buy_price;
        let raw_size = opportunity
            .max_volume
            .min(self.config.max_position_size / buy_price)
            .min(daily_headroom);

        // Higher-risk opportunities get smaller size.
        let risk_discount =
            Decimal::ONE - Decimal::from(opportunity.risk_score) / Decimal::ONE_HUNDRED * dec!(0.5);
        let size = (raw_size * risk_discount).max(Decimal::ZERO);

        if size <= Decimal::ZERO {
            return Err(ArbError::Validation {
                reason: "computed position size is zero".to_string(),
            });
        }

        let buy_fee = self
            .fee_model
            .leg_fee(&opportunity.buy_venue, buy_price, size);
        let sell_fee = self
            .fee_model
            .leg_fee(&opportunity.sell_venue, opportunity.sell_price, size);
        let total_fees = buy_fee + sell_fee;
        let notional = size * buy_price;

        let mut risk_factors = Vec::new();
        if opportunity.liquidity_risk != RiskLevel::Low {
            risk_factors.push(format!("liquidity risk {:?}", opportunity.liquidity_risk));
        }
        if opportunity.execution_risk != RiskLevel::Low {
            risk_factors.push(format!("execution risk {:?}", opportunity.execution_risk));
        }
        if opportunity.risk_score > 50 {
            risk_factors.push(format!("risk score {}", opportunity.risk_score));
        }

        Ok(ExecutionPlan {
            id: uuid::Uuid::new_v4().to_string(),
            buy_leg: OrderLeg {
                venue_id: opportunity.buy_venue.clone(),
                order: OrderRequest::ioc(&opportunity.symbol, OrderSide::Buy, size, buy_price),
                estimated_fee: buy_fee,
            },
            sell_leg: OrderLeg {
                venue_id: opportunity.sell_venue.clone(),
                order: OrderRequest::ioc(
                    &opportunity.symbol,
                    OrderSide::Sell,
                    size,
                    opportunity.sell_price,
                ),
                estimated_fee: sell_fee,
            },
            risk_score: opportunity.risk_score,
            risk_factors,
            max_loss: total_fees + notional * SLIPPAGE_BUFFER,
            expected_profit: opportunity.net_spread * size - total_fees,
            created_at: now,
            expires_at: opportunity.expires_at,
            status: PlanStatus::Pending,
            opportunity: opportunity.clone(),
        })
    }

    /// All checks must hold or the plan is rejected and never executed.
    /// Runs immediately before dispatch so a stale opportunity is caught
    /// here rather than at the venue.
    pub fn validate_plan(&self, plan: &ExecutionPlan, now: DateTime<Utc>) -> ArbResult<()> {
        if now >= plan.expires_at {
            return Err(ArbError::Validation {
                reason: format!("plan {} expired at {}", plan.id, plan.expires_at),
            });
        }
        if plan.max_loss > self.config.risk_budget_per_trade {
            return Err(ArbError::Validation {
                reason: format!(
                    "max loss {} exceeds risk budget {}",
                    plan.max_loss, self.config.risk_budget_per_trade
                ),
            });
        }
        let notional = plan.buy_leg.order.quantity * plan.opportunity.buy_price;
        if notional > self.config.max_position_size {
            return Err(ArbError::Validation {
                reason: format!(
                    "notional {} exceeds max position size {}",
                    notional, self.config.max_position_size
                ),
            });
        }
        if plan.expected_profit <= Decimal::ZERO {
            return Err(ArbError::Validation {
                reason: format!("expected profit {} is not positive", plan.expected_profit),
            });
        }
        Ok(())
    }
}
