// eventshop-retry-rabbitmq/src/headers.rs
use eventshop_retry_core::{Message, RetryCountHeader, RetryHeaders, RETRY_COUNT_HEADER};
use lapin::{
    types::{AMQPValue, FieldTable},
    BasicProperties,
};

/// AMQP header table of a delivery.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AmqpHeaders(pub FieldTable);

impl AmqpHeaders {
    pub fn into_inner(self) -> FieldTable {
        self.0
    }
}

impl From<FieldTable> for AmqpHeaders {
    fn from(table: FieldTable) -> Self {
        Self(table)
    }
}

impl RetryHeaders for AmqpHeaders {
    fn retry_count_header(&self) -> RetryCountHeader<'_> {
        let value = self
            .0
            .inner()
            .iter()
            .find(|(k, _)| k.as_str() == RETRY_COUNT_HEADER)
            .map(|(_, v)| v);

        match value {
            None => RetryCountHeader::Absent,
            Some(AMQPValue::LongInt(n)) => RetryCountHeader::Int32(*n),
            Some(AMQPValue::LongLongInt(n)) => RetryCountHeader::Int64(*n),
            Some(AMQPValue::ShortString(s)) => RetryCountHeader::Text(s.as_str()),
            Some(AMQPValue::LongString(s)) => match std::str::from_utf8(s.as_bytes()) {
                Ok(text) => RetryCountHeader::Text(text),
                Err(_) => RetryCountHeader::Unsupported,
            },
            Some(_) => RetryCountHeader::Unsupported,
        }
    }

    fn set_retry_count(&mut self, attempt: i32) {
        self.0
            .insert(RETRY_COUNT_HEADER.into(), AMQPValue::LongInt(attempt));
    }
}

/// Retry view of a delivery's body and properties.
pub fn message_from_parts(data: &[u8], properties: &BasicProperties) -> Message<AmqpHeaders> {
    let headers = properties
        .headers()
        .clone()
        .map(AmqpHeaders)
        .unwrap_or_default();
    Message {
        body: data.to_vec(),
        content_type: properties
            .content_type()
            .as_ref()
            .map(|ct| ct.as_str().to_string()),
        headers,
    }
}
