mod headers;
mod options;
mod rabbit_retry_broker;
mod retry_consumer;

pub use headers::{message_from_parts, AmqpHeaders};
pub use options::ConsumerOptions;
pub use rabbit_retry_broker::{publish_properties, queue_arguments, RabbitRetryBroker};
pub use retry_consumer::RetryConsumer;
