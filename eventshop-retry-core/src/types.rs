// eventshop-retry-core/src/types.rs
use std::collections::BTreeMap;

/// Header carrying the number of attempts already made for a message lineage.
pub const RETRY_COUNT_HEADER: &str = "x-retry-count";

/// Accepted encodings of the retry header, decoded once at the broker boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCountHeader<'a> {
    Absent,
    Int32(i32),
    Int64(i64),
    Text(&'a str),
    Unsupported,
}

/// Header table of a broker message as seen by the retry logic.
///
/// Adapters implement this for their wire header type so the retry counter
/// never has to know about it.
pub trait RetryHeaders: Clone + Send + Sync {
    fn retry_count_header(&self) -> RetryCountHeader<'_>;

    /// Overwrite (or insert) the retry header as a 32-bit integer.
    fn set_retry_count(&mut self, attempt: i32);
}

/// Broker-neutral header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f64),
    Text(String),
}

pub type HeaderMap = BTreeMap<String, HeaderValue>;

impl RetryHeaders for HeaderMap {
    fn retry_count_header(&self) -> RetryCountHeader<'_> {
        match self.get(RETRY_COUNT_HEADER) {
            None => RetryCountHeader::Absent,
            Some(HeaderValue::Int32(v)) => RetryCountHeader::Int32(*v),
            Some(HeaderValue::Int64(v)) => RetryCountHeader::Int64(*v),
            Some(HeaderValue::Text(s)) => RetryCountHeader::Text(s),
            Some(_) => RetryCountHeader::Unsupported,
        }
    }

    fn set_retry_count(&mut self, attempt: i32) {
        self.insert(RETRY_COUNT_HEADER.to_string(), HeaderValue::Int32(attempt));
    }
}

/// Incoming message handed to the republisher.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<H> {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub headers: H,
}

impl<H> Message<H> {
    pub fn new(body: impl Into<Vec<u8>>, headers: H) -> Self {
        Self {
            body: body.into(),
            content_type: None,
            headers,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Message as it goes back out to the retry queue.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage<H> {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub headers: H,
    /// Per-message TTL in milliseconds, decimal string as AMQP expects.
    pub expiration: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_map_decodes_known_encodings() {
        let mut h = HeaderMap::new();
        assert_eq!(h.retry_count_header(), RetryCountHeader::Absent);

        h.insert(RETRY_COUNT_HEADER.into(), HeaderValue::Int64(9));
        assert_eq!(h.retry_count_header(), RetryCountHeader::Int64(9));

        h.insert(RETRY_COUNT_HEADER.into(), HeaderValue::Text("12".into()));
        assert_eq!(h.retry_count_header(), RetryCountHeader::Text("12"));

        h.insert(RETRY_COUNT_HEADER.into(), HeaderValue::Float(2.5));
        assert_eq!(h.retry_count_header(), RetryCountHeader::Unsupported);
    }

    #[test]
    fn set_retry_count_overwrites_as_int32() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_COUNT_HEADER.into(), HeaderValue::Text("1".into()));
        h.set_retry_count(3);
        assert_eq!(h.get(RETRY_COUNT_HEADER), Some(&HeaderValue::Int32(3)));
    }
}
