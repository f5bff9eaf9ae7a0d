use async_trait::async_trait;
use lapin::{
    options::*,
    types::{AMQPValue, FieldTable},
    BasicProperties, Channel, ExchangeKind,
};
use tracing::debug;

use crate::headers::AmqpHeaders;
use eventshop_retry_core::{OutgoingMessage, QueueSpec, RetryBroker, RetryError};

/// `RetryBroker` over a caller-owned lapin channel.
#[derive(Clone)]
pub struct RabbitRetryBroker {
    ch: Channel,
}

impl RabbitRetryBroker {
    pub fn new(ch: Channel) -> Self {
        Self { ch }
    }

    pub fn channel(&self) -> &Channel {
        &self.ch
    }
}

/// Queue arguments for a retry topology queue.
pub fn queue_arguments(spec: &QueueSpec) -> FieldTable {
    let mut args = FieldTable::default();
    if spec.quorum {
        args.insert(
            "x-queue-type".into(),
            AMQPValue::LongString("quorum".to_string().into()),
        );
    }
    if let Some(dl) = &spec.dead_letter {
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(dl.exchange.clone().into()),
        );
        args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(dl.routing_key.clone().into()),
        );
    }
    args
}

pub fn publish_properties(message: &OutgoingMessage<AmqpHeaders>) -> BasicProperties {
    let mut props = BasicProperties::default()
        .with_headers(message.headers.0.clone())
        .with_expiration(message.expiration.clone().into());
    if let Some(ct) = &message.content_type {
        props = props.with_content_type(ct.clone().into());
    }
    props
}

#[async_trait]
impl RetryBroker for RabbitRetryBroker {
    type Headers = AmqpHeaders;

    async fn declare_direct_exchange(&self, name: &str) -> Result<(), RetryError> {
        self.ch
            .exchange_declare(
                name,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    internal: false,
                    nowait: false,
                    passive: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| RetryError::Broker(e.to_string()))
    }

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<(), RetryError> {
        let q = self
            .ch
            .queue_declare(
                &spec.name,
                QueueDeclareOptions {
                    durable: spec.durable,
                    auto_delete: false,
                    exclusive: false,
                    nowait: false,
                    passive: false,
                },
                queue_arguments(spec),
            )
            .await
            .map_err(|e| RetryError::Broker(e.to_string()))?;
        debug!("queue declared. queue={} messages={}", q.name(), q.message_count());
        Ok(())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), RetryError> {
        self.ch
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions { nowait: false },
                FieldTable::default(),
            )
            .await
            .map_err(|e| RetryError::Broker(e.to_string()))
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutgoingMessage<AmqpHeaders>,
    ) -> Result<(), RetryError> {
        let confirm = self
            .ch
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions {
                    mandatory: false,
                    immediate: false,
                },
                &message.body,
                publish_properties(&message),
            )
            .await
            .map_err(|e| RetryError::Publish(e.to_string()))?
            .await
            .map_err(|e| RetryError::Publish(e.to_string()))?;

        if confirm.is_nack() {
            return Err(RetryError::Publish("publisher confirm NACK".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventshop_retry_core::{DeadLetter, RetryHeaders, RETRY_COUNT_HEADER};

    fn arg<'a>(table: &'a FieldTable, key: &str) -> Option<&'a AMQPValue> {
        table
            .inner()
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    #[test]
    fn retry_queue_arguments_carry_dead_letter_target() {
        let spec = QueueSpec {
            name: "retry_queue".into(),
            durable: true,
            quorum: true,
            dead_letter: Some(DeadLetter {
                exchange: "main_exchange".into(),
                routing_key: "main_key".into(),
            }),
        };
        let args = queue_arguments(&spec);
        assert_eq!(
            arg(&args, "x-queue-type"),
            Some(&AMQPValue::LongString("quorum".to_string().into()))
        );
        assert_eq!(
            arg(&args, "x-dead-letter-exchange"),
            Some(&AMQPValue::LongString("main_exchange".to_string().into()))
        );
        assert_eq!(
            arg(&args, "x-dead-letter-routing-key"),
            Some(&AMQPValue::LongString("main_key".to_string().into()))
        );
    }

    #[test]
    fn main_queue_arguments_have_no_dead_letter() {
        let spec = QueueSpec {
            name: "main_queue".into(),
            durable: true,
            quorum: true,
            dead_letter: None,
        };
        let args = queue_arguments(&spec);
        assert!(arg(&args, "x-dead-letter-exchange").is_none());
        assert!(arg(&args, "x-queue-type").is_some());
    }

    #[test]
    fn publish_properties_set_ttl_and_headers() {
        let mut headers = AmqpHeaders::default();
        headers.set_retry_count(2);
        let msg = OutgoingMessage {
            body: b"{}".to_vec(),
            content_type: Some("application/json".into()),
            headers,
            expiration: "3000".into(),
        };

        let props = publish_properties(&msg);
        assert_eq!(
            props.expiration().as_ref().map(|e| e.as_str()),
            Some("3000")
        );
        assert_eq!(
            props.content_type().as_ref().map(|c| c.as_str()),
            Some("application/json")
        );
        let table = props.headers().clone().unwrap();
        assert_eq!(arg(&table, RETRY_COUNT_HEADER), Some(&AMQPValue::LongInt(2)));
    }
}
