//! Configuration management for the arbitrage engine

pub mod settings;

pub use settings::*;

use lazy_static::lazy_static;

lazy_static! {
    pub static ref CONFIG: ArbitrageConfig = ArbitrageConfig::load();
}
