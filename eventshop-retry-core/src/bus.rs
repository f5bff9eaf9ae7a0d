// eventshop-retry-core/src/bus.rs
use async_trait::async_trait;

use crate::types::{OutgoingMessage, RetryHeaders};
use crate::RetryError;

/// Dead-letter target of a queue: where expired messages are re-routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub quorum: bool,
    pub dead_letter: Option<DeadLetter>,
}

/// The broker operations the retry logic needs. One implementation per
/// broker client; the channel behind it belongs to the caller.
#[async_trait]
pub trait RetryBroker: Send + Sync {
    type Headers: RetryHeaders;

    /// Durable, non-auto-delete exchange of type `direct`.
    async fn declare_direct_exchange(&self, name: &str) -> Result<(), RetryError>;

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), RetryError>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), RetryError>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutgoingMessage<Self::Headers>,
    ) -> Result<(), RetryError>;
}
