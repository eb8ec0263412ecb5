//! Structured events published on the engine's broadcast stream
//!
//! Consumers (metrics, alerting, dashboards) subscribe explicitly instead of
//! relying on ambient event names.

use rust_decimal::Decimal;
use serde::Serialize;
use super::{
    ArbitrageOpportunity, ExecutionResult, OrderSide, PerformanceMetrics, VenueStatus,
};

/// Notifications emitted by a venue connector and re-published by the registry.
#[derive(Debug, Clone, Serialize)]
pub enum VenueEvent {
    StatusChanged { venue_id: String, status: VenueStatus },
    OrderExecuted { venue_id: String, order_id: String },
    Error { venue_id: String, message: String },
}

/// Events published by the arbitrage core for external consumption.
#[derive(Debug, Clone, Serialize)]
pub enum ArbEvent {
    VenueRegistered {
        venue_id: String,
    },
    VenueUnregistered {
        venue_id: String,
    },
    VenueHealthChanged {
        venue_id: String,
        healthy: bool,
    },
    /// A venue failed to answer a market-data/order-book/balance request.
    DataError {
        venue_id: String,
        symbol: Option<String>,
        message: String,
    },
    OpportunitiesDetected {
        symbol: String,
        count: usize,
    },
    HighValueOpportunity {
        opportunity: ArbitrageOpportunity,
    },
    ExecutionCompleted {
        result: ExecutionResult,
    },
    /// A one-sided fill left exposure that was not automatically unwound.
    UnhedgedExposure {
        plan_id: String,
        venue_id: String,
        side: OrderSide,
        quantity: Decimal,
    },
    PerformanceSnapshot {
        metrics: PerformanceMetrics,
    },
    Venue(VenueEvent),
}
