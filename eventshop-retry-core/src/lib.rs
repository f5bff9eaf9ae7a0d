pub mod bus;
pub mod config;
pub mod counter;
pub mod delay;
pub mod error;
pub mod republish;
pub mod topology;
pub mod types;

pub use bus::{DeadLetter, QueueSpec, RetryBroker};
pub use config::{CallOptions, RetryConfig, RetryConfigBuilder, RetryOptions, TopologyNames};
pub use counter::{message_retry_count, retry_count};
pub use delay::{compute_delay, Backoff, DefaultBackoff, DelayDecision};
pub use error::RetryError;
pub use republish::{build_retry_headers, retry};
pub use topology::{declare_topology, init, TopologyAction, TopologyPlan, TopologyStep};
pub use types::{
    HeaderMap, HeaderValue, Message, OutgoingMessage, RetryCountHeader, RetryHeaders,
    RETRY_COUNT_HEADER,
};
