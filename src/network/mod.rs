//! Network-facing helpers shared by venue calls

pub mod retry;

pub use retry::*;
