//! Bounded execution history and running performance aggregates

use rust_decimal::Decimal;
use std::collections::VecDeque;
use crate::types::{ExecutionResult, PerformanceMetrics};

/// Most recent results kept; older entries are evicted.
pub const MAX_HISTORY: usize = 1000;

#[derive(Default)]
pub struct PerformanceTracker {
    history: VecDeque<ExecutionResult>,
    total_executions: u64,
    successful_executions: u64,
    net_profit: Decimal,
    total_fees: Decimal,
    total_volume: Decimal,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &ExecutionResult) {
        self.total_executions += 1;
        if result.success {
            self.successful_executions += 1;
        }
        self.net_profit += result.realized_profit;
        self.total_fees += result.total_fees;
        if let Some(buy) = &result.buy_result {
            self.total_volume += buy.execution_price * buy.executed_quantity;
        }

        self.history.push_back(result.clone());
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl DoubleEndedIterator<Item = &ExecutionResult> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        let success_rate = if self.total_executions > 0 {
            self.successful_executions as f64 / self.total_executions as f64
        } else {
            0.0
        };
        let average_profit = if self.total_executions > 0 {
            self.net_profit / Decimal::from(self.total_executions)
        } else {
            Decimal::ZERO
        };
        let roi_percent = if self.total_volume > Decimal::ZERO {
            self.net_profit / self.total_volume * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        PerformanceMetrics {
            total_executions: self.total_executions,
            successful_executions: self.successful_executions,
            success_rate,
            // Gross of fees; net_profit below is what the book keeps.
            total_profit: self.net_profit + self.total_fees,
            average_profit,
            total_fees: self.total_fees,
            net_profit: self.net_profit,
            total_volume: self.total_volume,
            roi_percent,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
