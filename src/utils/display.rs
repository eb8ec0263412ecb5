//! Display and printing utilities

use std::time::Instant;
use tracing::info;
use crate::types::{ArbitrageOpportunity, ConnectionPoolSummary, ExecutionResult, PerformanceMetrics};

pub fn print_opportunity(opp: &ArbitrageOpportunity) {
    info!("\n💰 ARBITRAGE OPPORTUNITY");
    info!("   {} | buy {} @ ${:.4} → sell {} @ ${:.4}",
        opp.symbol, opp.buy_venue, opp.buy_price, opp.sell_venue, opp.sell_price);
    info!("   Net spread: {:.4} ({:.3}%)", opp.net_spread, opp.net_spread_percent);
    info!("   Max volume: {} | Est. profit: ${:.2} | Capital: ${:.2}",
        opp.max_volume, opp.estimated_profit, opp.required_capital);
    info!("   Risk: {}/100 ({:?} liquidity, {:?} execution) | Quality: {:?} | Confidence: {:.2}",
        opp.risk_score, opp.liquidity_risk, opp.execution_risk, opp.quality, opp.confidence);
}

pub fn print_execution_result(result: &ExecutionResult) {
    if result.success {
        info!("\n✅ Execution {} completed in {}ms", result.plan_id, result.execution_time_ms);
        info!("   Profit: ${:.4} ({:.3}%) | Fees: ${:.4} | Slippage: {:.4}",
            result.realized_profit, result.realized_profit_percent,
            result.total_fees, result.slippage);
        info!("   Efficiency: {:.2} | Timing: {:.2} | Risk-adjusted return: {:.3}",
            result.execution_efficiency, result.timing_score, result.risk_adjusted_return);
    } else {
        info!("\n❌ Execution {} failed after {}ms: {}",
            result.plan_id, result.execution_time_ms,
            result.error.as_deref().unwrap_or("unknown"));
        info!("   Buy leg filled: {} | Sell leg filled: {}",
            result.buy_result.is_some(), result.sell_result.is_some());
    }
}

pub fn print_performance(metrics: &PerformanceMetrics) {
    info!("\n📊 Performance snapshot");
    info!("   Executions: {} ({} successful, {:.1}% success rate)",
        metrics.total_executions, metrics.successful_executions,
        metrics.success_rate * 100.0);
    info!("   Net profit: ${:.4} | Fees: ${:.4} | Avg: ${:.4}",
        metrics.net_profit, metrics.total_fees, metrics.average_profit);
    info!("   Volume: ${:.2} | ROI: {:.3}%", metrics.total_volume, metrics.roi_percent);
}

pub fn print_session_stats(
    start_time: Instant,
    metrics: &PerformanceMetrics,
    pool: &ConnectionPoolSummary,
) {
    let runtime = start_time.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   📈 EXECUTIONS:");
    info!("     Total: {}", metrics.total_executions);
    info!("     Successful: {}", metrics.successful_executions);
    info!("     Success rate: {:.1}%", metrics.success_rate * 100.0);
    info!("     Net profit: ${:.2}", metrics.net_profit);
    info!("   🏦 VENUES:");
    info!("     Registered: {}", pool.total_venues);
    info!("     Healthy: {} ({:.0}%)", pool.healthy_venues, pool.health_ratio * 100.0);
    info!("   ⚙️  SYSTEM:");
    info!("     Uptime: {:?}", start_time.elapsed());
}
