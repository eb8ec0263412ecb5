//! Cross-Venue Arbitrage Bot - continuously compares prices for the same
//! instrument across independent trading venues, scores the discrepancies
//! into time-bounded opportunities, and executes two-legged trades under a
//! strict time budget with explicit risk limits.

pub mod arbitrage;
pub mod config;
pub mod errors;
pub mod execution;
pub mod lifecycle;
pub mod network;
pub mod storage;
pub mod types;
pub mod utils;
pub mod venues;

// Re-export commonly used items
pub use config::{ArbitrageConfig, CONFIG};
pub use errors::{ArbError, ArbResult};
pub use lifecycle::ArbitrageEngine;
pub use types::*;
