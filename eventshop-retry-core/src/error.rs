// eventshop-retry-core/src/error.rs
use thiserror::Error;

use crate::topology::TopologyStep;

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("topology error at {step}: {reason}")]
    Topology { step: TopologyStep, reason: String },

    #[error("max retry attempts reached ({max_attempts}), attempt {attempt}")]
    MaxAttemptsExceeded { attempt: u64, max_attempts: u32 },

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("broker error: {0}")]
    Broker(String),
}

impl RetryError {
    /// True when the message ran out of attempts; the caller owns what happens next.
    pub fn is_max_attempts(&self) -> bool {
        matches!(self, RetryError::MaxAttemptsExceeded { .. })
    }
}
