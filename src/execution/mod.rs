//! Execution planning and dual-leg coordination

pub mod engine;
pub mod metrics;
pub mod planner;

pub use engine::*;
pub use metrics::*;
pub use planner::*;
