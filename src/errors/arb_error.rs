//! Custom error types for the arbitrage core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArbError {
    #[error("Capacity limit reached: {reason}")]
    Capacity {
        reason: String,
    },

    #[error("Venue already registered: {venue_id}")]
    Duplicate {
        venue_id: String,
    },

    #[error("Venue not found: {venue_id}")]
    NotFound {
        venue_id: String,
    },

    #[error("Plan validation failed: {reason}")]
    Validation {
        reason: String,
    },

    #[error("Data request failed on {venue_id}: {message}")]
    Data {
        venue_id: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Order execution failed on {venue_id}: {message}")]
    Execution {
        venue_id: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("{context} timed out after {timeout_ms}ms")]
    Timeout {
        context: String,
        timeout_ms: u64,
    },
}

impl ArbError {
    /// The venue this error is tagged with, if any.
    pub fn venue_id(&self) -> Option<&str> {
        match self {
            ArbError::Duplicate { venue_id }
            | ArbError::NotFound { venue_id }
            | ArbError::Data { venue_id, .. }
            | ArbError::Execution { venue_id, .. } => Some(venue_id),
            _ => None,
        }
    }
}

pub type ArbResult<T> = Result<T, ArbError>;
