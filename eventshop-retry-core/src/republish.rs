// eventshop-retry-core/src/republish.rs
use tracing::{info, warn};

use crate::bus::RetryBroker;
use crate::config::{CallOptions, RetryConfig};
use crate::counter::message_retry_count;
use crate::delay::{compute_delay, DelayDecision};
use crate::types::{Message, OutgoingMessage, RetryHeaders};
use crate::RetryError;

/// Copy of `headers` with the retry counter set to `attempt`, capped at
/// `i32::MAX` since the header is a 32-bit integer.
pub fn build_retry_headers<H: RetryHeaders>(headers: &H, attempt: u64) -> H {
    let mut out = headers.clone();
    out.set_retry_count(i32::try_from(attempt).unwrap_or(i32::MAX));
    out
}

/// Sends `message` to the retry queue with a TTL; the broker hands it back to
/// the main queue once the TTL expires.
///
/// Returns [`RetryError::MaxAttemptsExceeded`] without publishing when the
/// message is out of attempts. Publish failures come back unchanged.
pub async fn retry<B>(
    config: &RetryConfig,
    broker: &B,
    message: &Message<B::Headers>,
    options: &CallOptions,
) -> Result<DelayDecision, RetryError>
where
    B: RetryBroker + ?Sized,
{
    let attempt = message_retry_count(&message.headers);
    let max_attempts = config.max_attempts();

    if attempt > u64::from(max_attempts) {
        warn!("max retry attempts reached ({max_attempts})");
        return Err(RetryError::MaxAttemptsExceeded {
            attempt,
            max_attempts,
        });
    }

    let headers = build_retry_headers(&message.headers, attempt);
    // bounded by max_attempts above
    let attempt = u32::try_from(attempt).unwrap_or(max_attempts);
    let decision = compute_delay(options, attempt, config.backoff());
    info!("attempt {attempt}/{max_attempts} with delay {decision}");

    let names = config.names();
    broker
        .publish(
            &names.main_exchange,
            &names.retry_routing_key,
            OutgoingMessage {
                body: message.body.clone(),
                content_type: message.content_type.clone(),
                headers,
                expiration: decision.expiration_ms(),
            },
        )
        .await?;

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HeaderMap, HeaderValue, RETRY_COUNT_HEADER};

    #[test]
    fn build_headers_keeps_others_and_overrides_count() {
        let mut headers = HeaderMap::new();
        headers.insert("x-original".into(), HeaderValue::Text("keep-me".into()));
        headers.insert(RETRY_COUNT_HEADER.into(), HeaderValue::Int32(1));

        let out = build_retry_headers(&headers, 3);

        assert_eq!(out.get("x-original"), Some(&HeaderValue::Text("keep-me".into())));
        assert_eq!(out.get(RETRY_COUNT_HEADER), Some(&HeaderValue::Int32(3)));
        assert_eq!(headers.get(RETRY_COUNT_HEADER), Some(&HeaderValue::Int32(1)));
    }

    #[test]
    fn build_headers_saturates() {
        let out = build_retry_headers(&HeaderMap::new(), u64::MAX);
        assert_eq!(out.get(RETRY_COUNT_HEADER), Some(&HeaderValue::Int32(i32::MAX)));
    }
}
