use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use lapin::{message::Delivery, options::*, types::FieldTable, Channel};
use tracing::info;

use crate::headers::message_from_parts;
use crate::options::ConsumerOptions;
use crate::rabbit_retry_broker::RabbitRetryBroker;
use eventshop_retry_core::{
    CallOptions, DelayDecision, RetryConfig, RetryError, RetryOptions, TopologyNames,
};

/// Consumer of the main queue that can send failed deliveries back through
/// the retry queue.
///
/// The channel is shared with the caller; deliveries must still be acked by
/// the caller after `retry` (or after terminal handling).
pub struct RetryConsumer {
    broker: RabbitRetryBroker,
    config: Arc<RetryConfig>,
    opts: ConsumerOptions,
}

impl RetryConsumer {
    /// Declares the retry topology on `ch` and returns a consumer bound to it.
    pub async fn init(
        ch: Channel,
        names: TopologyNames,
        retry_options: RetryOptions,
        opts: ConsumerOptions,
    ) -> Result<Self, RetryError> {
        let broker = RabbitRetryBroker::new(ch);
        let config = eventshop_retry_core::init(&broker, names, retry_options).await?;

        if opts.confirms {
            broker
                .channel()
                .confirm_select(ConfirmSelectOptions { nowait: false })
                .await
                .map_err(|e| RetryError::Broker(e.to_string()))?;
        }

        Ok(Self {
            broker,
            config: Arc::new(config),
            opts,
        })
    }

    pub fn config(&self) -> Arc<RetryConfig> {
        Arc::clone(&self.config)
    }

    /// Subscribes to the main queue. The stream ends when the subscription
    /// does; it cannot be restarted.
    ///
    /// Returns `Ok` whenever `basic_qos` and `basic_consume` succeed; only a
    /// failure of one of those calls yields [`RetryError::Subscribe`]. Covered
    /// against a live broker by `tests/smoke_it.rs` (ignored by default).
    pub async fn consume(
        &self,
    ) -> Result<impl Stream<Item = Result<Delivery, RetryError>>, RetryError> {
        let ch = self.broker.channel();
        ch.basic_qos(self.opts.prefetch, BasicQosOptions { global: false })
            .await
            .map_err(|e| RetryError::Subscribe(e.to_string()))?;

        let queue = &self.config.names().main_queue;
        let consumer = ch
            .basic_consume(
                queue,
                &self.opts.consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    exclusive: false,
                    nowait: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| RetryError::Subscribe(e.to_string()))?;

        info!("Consuming queue={} tag={}", queue, consumer.tag().as_str());
        Ok(consumer.map(|delivery| delivery.map_err(|e| RetryError::Subscribe(e.to_string()))))
    }

    /// Reschedules `delivery` after a backoff (or `options.delay_in_seconds`).
    pub async fn retry(
        &self,
        delivery: &Delivery,
        options: &CallOptions,
    ) -> Result<DelayDecision, RetryError> {
        let message = message_from_parts(&delivery.data, &delivery.properties);
        eventshop_retry_core::retry(&self.config, &self.broker, &message, options).await
    }
}
