//! Core error types.

use thiserror::Error;

/// Errors produced by the market state pipeline.
///
/// `InsufficientHistory` is a normal warmup condition: the calculator turns it
/// into "no output this bar". `InvalidConfiguration` is fatal and only ever
/// returned from construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketStateError {
    #[error("insufficient history: offset {required} requested, {available} bars available")]
    InsufficientHistory { required: usize, available: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl MarketStateError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn is_insufficient_history(&self) -> bool {
        matches!(self, Self::InsufficientHistory { .. })
    }
}
