//! Engine configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Configuration bounds
pub const MIN_PROFIT_THRESHOLD_FLOOR: Decimal = dec!(0.01); // percent
pub const MAX_PROFIT_THRESHOLD_CEILING: Decimal = dec!(50); // percent, above this is bad data
pub const MIN_CONCURRENT_ARBITRAGES: u32 = 1;
pub const MAX_CONCURRENT_ARBITRAGES: u32 = 50;
pub const MAX_REGISTERED_VENUES: usize = 64;

// Lifecycle constants
pub const CLEANUP_INTERVAL_SECS: u64 = 60;
/// Cache entries older than this many poll intervals are tagged stale.
pub const STALE_AFTER_INTERVALS: u32 = 3;

/// What to do with a filled leg after the opposite leg fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialFillPolicy {
    /// Report and alert; never trade automatically.
    Hold,
    /// Submit a best-effort reverse IOC order on the filled leg.
    Unwind,
}

#[derive(Debug, Clone)]
pub struct ArbitrageConfig {
    // Profit thresholds (percent)
    pub min_profit_threshold: Decimal,
    pub max_profit_threshold: Decimal,
    // Volume / latency / size limits
    pub min_volume_threshold: Decimal,
    pub max_latency_ms: u64,
    pub max_position_size: Decimal,
    pub max_daily_volume: Decimal,
    // Concurrency and risk budget
    pub max_concurrent_arbitrages: u32,
    pub risk_budget_per_trade: Decimal,
    // Timeouts and intervals
    pub execution_timeout_ms: u64,
    pub price_update_interval_ms: u64,
    pub performance_review_interval_ms: u64,
    pub opportunity_expiry_ms: u64,
    pub health_check_interval_ms: u64,
    pub portfolio_cache_ttl_ms: u64,
    // Registry
    pub max_venues: usize,
    // Execution behaviour
    pub auto_execute: bool,
    pub pre_trade_validation: bool,
    pub post_trade_reconciliation: bool,
    pub partial_fill_policy: PartialFillPolicy,
    // Alerting
    pub alert_spread_percent: Decimal,
    pub alert_volume: Decimal,
    // Scan universe
    pub symbols: Vec<String>,
    // Scan-loop circuit breaker
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown_secs: u64,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_profit_threshold: dec!(0.1),
            max_profit_threshold: dec!(5.0),
            min_volume_threshold: dec!(10),
            max_latency_ms: 1000,
            max_position_size: dec!(10000),
            max_daily_volume: dec!(100000),
            max_concurrent_arbitrages: 5,
            risk_budget_per_trade: dec!(100),
            execution_timeout_ms: 10_000,
            price_update_interval_ms: 5_000,
            performance_review_interval_ms: 60_000,
            opportunity_expiry_ms: 30_000,
            health_check_interval_ms: 30_000,
            portfolio_cache_ttl_ms: 30_000,
            max_venues: 10,
            auto_execute: false,
            pre_trade_validation: true,
            post_trade_reconciliation: true,
            partial_fill_policy: PartialFillPolicy::Hold,
            alert_spread_percent: dec!(1.0),
            alert_volume: dec!(5000),
            symbols: vec!["BTC-USD".to_string(), "ETH-USD".to_string()],
            max_consecutive_errors: 5,
            circuit_breaker_cooldown_secs: 300,
        }
    }
}

impl ArbitrageConfig {
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            min_profit_threshold: env_decimal("MIN_PROFIT_THRESHOLD")
                .unwrap_or(defaults.min_profit_threshold)
                .max(MIN_PROFIT_THRESHOLD_FLOOR),
            max_profit_threshold: env_decimal("MAX_PROFIT_THRESHOLD")
                .unwrap_or(defaults.max_profit_threshold)
                .min(MAX_PROFIT_THRESHOLD_CEILING),
            min_volume_threshold: env_decimal("MIN_VOLUME_THRESHOLD")
                .unwrap_or(defaults.min_volume_threshold),
            max_latency_ms: env_parse("MAX_LATENCY_MS").unwrap_or(defaults.max_latency_ms),
            max_position_size: env_decimal("MAX_POSITION_SIZE")
                .unwrap_or(defaults.max_position_size),
            max_daily_volume: env_decimal("MAX_DAILY_VOLUME")
                .unwrap_or(defaults.max_daily_volume),
            max_concurrent_arbitrages: env_parse("MAX_CONCURRENT_ARBITRAGES")
                .unwrap_or(defaults.max_concurrent_arbitrages)
                .max(MIN_CONCURRENT_ARBITRAGES)
                .min(MAX_CONCURRENT_ARBITRAGES),
            risk_budget_per_trade: env_decimal("RISK_BUDGET_PER_TRADE")
                .unwrap_or(defaults.risk_budget_per_trade),
            execution_timeout_ms: env_parse("EXECUTION_TIMEOUT_MS")
                .unwrap_or(defaults.execution_timeout_ms),
            price_update_interval_ms: env_parse("PRICE_UPDATE_INTERVAL_MS")
                .unwrap_or(defaults.price_update_interval_ms),
            performance_review_interval_ms: env_parse("PERFORMANCE_REVIEW_INTERVAL_MS")
                .unwrap_or(defaults.performance_review_interval_ms),
            opportunity_expiry_ms: env_parse("OPPORTUNITY_EXPIRY_MS")
                .unwrap_or(defaults.opportunity_expiry_ms),
            health_check_interval_ms: env_parse("HEALTH_CHECK_INTERVAL_MS")
                .unwrap_or(defaults.health_check_interval_ms),
            portfolio_cache_ttl_ms: env_parse("PORTFOLIO_CACHE_TTL_MS")
                .unwrap_or(defaults.portfolio_cache_ttl_ms),
            max_venues: env_parse("MAX_VENUES")
                .unwrap_or(defaults.max_venues)
                .min(MAX_REGISTERED_VENUES),
            auto_execute: env_bool("AUTO_EXECUTE").unwrap_or(defaults.auto_execute),
            pre_trade_validation: env_bool("PRE_TRADE_VALIDATION")
                .unwrap_or(defaults.pre_trade_validation),
            post_trade_reconciliation: env_bool("POST_TRADE_RECONCILIATION")
                .unwrap_or(defaults.post_trade_reconciliation),
            partial_fill_policy: match env::var("PARTIAL_FILL_POLICY").ok().as_deref() {
                Some("unwind") | Some("UNWIND") => PartialFillPolicy::Unwind,
                _ => defaults.partial_fill_policy,
            },
            alert_spread_percent: env_decimal("ALERT_SPREAD_PERCENT")
                .unwrap_or(defaults.alert_spread_percent),
            alert_volume: env_decimal("ALERT_VOLUME").unwrap_or(defaults.alert_volume),
            symbols: env::var("SYMBOLS")
                .map(|s| {
                    s.split(',')
                        .map(|p| p.trim().to_string())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.symbols),
            max_consecutive_errors: env_parse("MAX_CONSECUTIVE_ERRORS")
                .unwrap_or(defaults.max_consecutive_errors),
            circuit_breaker_cooldown_secs: env_parse("CIRCUIT_BREAKER_COOLDOWN_SECS")
                .unwrap_or(defaults.circuit_breaker_cooldown_secs),
        }
    }

    pub fn price_update_interval(&self) -> Duration {
        Duration::from_millis(self.price_update_interval_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }

    /// Age past which a cache entry is tagged stale.
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(
            (self.price_update_interval_ms * STALE_AFTER_INTERVALS as u64) as i64,
        )
    }
}

fn env_decimal(key: &str) -> Option<Decimal> {
    env::var(key).ok().and_then(|s| Decimal::from_str(&s).ok())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
