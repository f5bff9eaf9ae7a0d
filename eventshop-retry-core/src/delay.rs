//! Delay computation for the next retry.
//!
//! The delay becomes the per-message TTL on the retry queue; when it expires
//! the broker dead-letters the message back to the main queue.

use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::CallOptions;

/// Maps an attempt number to a delay in seconds.
///
/// Any `Fn(u32) -> i64 + Send + Sync` closure is a backoff. Negative results
/// are clamped to zero by [`compute_delay`].
pub trait Backoff: Send + Sync {
    fn delay_seconds(&self, attempt: u32) -> i64;
}

impl<F> Backoff for F
where
    F: Fn(u32) -> i64 + Send + Sync,
{
    fn delay_seconds(&self, attempt: u32) -> i64 {
        self(attempt)
    }
}

/// Polynomial backoff with jitter: `attempt^4 + 5` seconds, spread over
/// `[base - 2, 2 * base - 3]` so messages failing together do not come back
/// together.
///
/// A fresh generator is built on every call. Unseeded instances draw from OS
/// entropy; seeded ones are deterministic per `(seed, attempt)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultBackoff {
    seed: Option<u64>,
}

impl DefaultBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    pub fn base(attempt: u32) -> u64 {
        u64::from(attempt).saturating_pow(4).saturating_add(5)
    }

    /// Every value `delay_seconds(attempt)` can produce.
    pub fn bounds(attempt: u32) -> RangeInclusive<u64> {
        let base = Self::base(attempt);
        (base - 2)..=base.saturating_mul(2).saturating_sub(3)
    }

    fn rng(&self, attempt: u32) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ u64::from(attempt)),
            None => StdRng::from_entropy(),
        }
    }
}

impl Backoff for DefaultBackoff {
    fn delay_seconds(&self, attempt: u32) -> i64 {
        let base = Self::base(attempt);
        let spread = self.rng(attempt).gen_range(0..base);
        let delay = (base - 2).saturating_add(spread);
        i64::try_from(delay).unwrap_or(i64::MAX)
    }
}

/// How long a message waits in the retry queue, and when it is due back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayDecision {
    pub delay_seconds: u64,
    pub expires_at: DateTime<Utc>,
}

impl DelayDecision {
    pub fn new(delay_seconds: u64, now: DateTime<Utc>) -> Self {
        let expires_at = i64::try_from(delay_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            delay_seconds,
            expires_at,
        }
    }

    /// AMQP `expiration` property: milliseconds as a decimal string.
    pub fn expiration_ms(&self) -> String {
        self.delay_seconds.saturating_mul(1000).to_string()
    }
}

impl fmt::Display for DelayDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}s (retry at {})",
            self.delay_seconds,
            self.expires_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Delay for `attempt`: an explicit `delay_in_seconds` wins, otherwise the
/// backoff decides.
pub fn compute_delay(options: &CallOptions, attempt: u32, backoff: &dyn Backoff) -> DelayDecision {
    let delay_seconds = match options.delay_in_seconds {
        Some(delay) => {
            debug!("using configured delay_in_second: {delay}");
            delay
        }
        None => {
            let raw = backoff.delay_seconds(attempt);
            u64::try_from(raw).unwrap_or_else(|_| {
                warn!("backoff returned negative delay {raw} for attempt {attempt}, using 0");
                0
            })
        }
    };
    DelayDecision::new(delay_seconds, Utc::now())
}
