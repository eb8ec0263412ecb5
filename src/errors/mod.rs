//! Error handling and recovery mechanisms

pub mod arb_error;
pub mod circuit_breaker;

pub use arb_error::*;
pub use circuit_breaker::*;
