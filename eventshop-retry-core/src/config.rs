// eventshop-retry-core/src/config.rs
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::delay::{Backoff, DefaultBackoff};
use crate::RetryError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Exchange, queue and routing key names of the retry topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyNames {
    pub main_exchange: String,
    pub main_queue: String,
    pub retry_queue: String,
    pub main_routing_key: String,
    pub retry_routing_key: String,
}

impl TopologyNames {
    pub fn new(
        main_exchange: &str,
        main_queue: &str,
        retry_queue: &str,
        main_routing_key: &str,
        retry_routing_key: &str,
    ) -> Self {
        Self {
            main_exchange: main_exchange.to_string(),
            main_queue: main_queue.to_string(),
            retry_queue: retry_queue.to_string(),
            main_routing_key: main_routing_key.to_string(),
            retry_routing_key: retry_routing_key.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), RetryError> {
        let fields = [
            ("main_exchange", &self.main_exchange),
            ("main_queue", &self.main_queue),
            ("retry_queue", &self.retry_queue),
            ("main_routing_key", &self.main_routing_key),
            ("retry_routing_key", &self.retry_routing_key),
        ];
        for (field, value) in fields {
            if value.is_empty() {
                return Err(RetryError::Config(format!("{field} must not be empty")));
            }
        }
        if self.main_queue == self.retry_queue {
            return Err(RetryError::Config(
                "main_queue and retry_queue must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Init-time overrides. Unset fields fall back to the defaults.
#[derive(Clone, Default)]
pub struct RetryOptions {
    pub max_attempts: Option<u32>,
    pub backoff: Option<Arc<dyn Backoff>>,
}

impl RetryOptions {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Some(Arc::new(backoff));
        self
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Per-call overrides for a single retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub delay_in_seconds: Option<u64>,
}

impl CallOptions {
    pub fn delay_in_seconds(mut self, seconds: u64) -> Self {
        self.delay_in_seconds = Some(seconds);
        self
    }
}

/// Immutable retry settings shared by every retry call of a consumer.
#[derive(Clone)]
pub struct RetryConfig {
    names: TopologyNames,
    max_attempts: u32,
    backoff: Arc<dyn Backoff>,
}

impl RetryConfig {
    pub fn new(names: TopologyNames, options: RetryOptions) -> Result<Self, RetryError> {
        Self::builder(names).options(options).build()
    }

    pub fn builder(names: TopologyNames) -> RetryConfigBuilder {
        RetryConfigBuilder {
            names,
            options: RetryOptions::default(),
        }
    }

    pub fn names(&self) -> &TopologyNames {
        &self.names
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &dyn Backoff {
        &*self.backoff
    }
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("names", &self.names)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

pub struct RetryConfigBuilder {
    names: TopologyNames,
    options: RetryOptions,
}

impl RetryConfigBuilder {
    pub fn options(mut self, options: RetryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.options.max_attempts = Some(max_attempts);
        self
    }

    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.options.backoff = Some(Arc::new(backoff));
        self
    }

    pub fn build(self) -> Result<RetryConfig, RetryError> {
        self.names.validate()?;

        let max_attempts = match self.options.max_attempts {
            Some(0) => {
                return Err(RetryError::Config(
                    "max-attempts must be at least 1".to_string(),
                ))
            }
            Some(n) => {
                info!("using configured max-attempts: {n}");
                n
            }
            None => {
                info!("'max-attempts' not set, using default: {DEFAULT_MAX_ATTEMPTS}");
                DEFAULT_MAX_ATTEMPTS
            }
        };

        let backoff = match self.options.backoff {
            Some(backoff) => {
                info!("using configured backoff function");
                backoff
            }
            None => Arc::new(DefaultBackoff::new()),
        };

        Ok(RetryConfig {
            names: self.names,
            max_attempts,
            backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> TopologyNames {
        TopologyNames::new("main_exchange", "main_queue", "retry_queue", "main_key", "retry_key")
    }

    #[test]
    fn defaults_to_five_attempts() {
        let cfg = RetryConfig::new(names(), RetryOptions::default()).unwrap();
        assert_eq!(cfg.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        let bounds = DefaultBackoff::bounds(1);
        assert!(bounds.contains(&(cfg.backoff().delay_seconds(1) as u64)));
    }

    #[test]
    fn options_override_defaults() {
        let cfg = RetryConfig::new(
            names(),
            RetryOptions::default()
                .max_attempts(3)
                .backoff(|attempt: u32| i64::from(attempt) * 10),
        )
        .unwrap();
        assert_eq!(cfg.max_attempts(), 3);
        assert_eq!(cfg.backoff().delay_seconds(2), 20);
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = RetryConfig::builder(names()).max_attempts(0).build().unwrap_err();
        assert!(matches!(err, RetryError::Config(_)));
    }

    #[test]
    fn empty_name_rejected() {
        let mut n = names();
        n.retry_routing_key.clear();
        let err = RetryConfig::new(n, RetryOptions::default()).unwrap_err();
        assert!(err.to_string().contains("retry_routing_key"));
    }

    #[test]
    fn same_main_and_retry_queue_rejected() {
        let mut n = names();
        n.retry_queue = n.main_queue.clone();
        assert!(n.validate().is_err());
    }

    #[test]
    fn names_deserialize_from_json() {
        let n: TopologyNames = serde_json::from_str(
            r#"{
                "main_exchange": "main_exchange",
                "main_queue": "main_queue",
                "retry_queue": "retry_queue",
                "main_routing_key": "main_key",
                "retry_routing_key": "retry_key"
            }"#,
        )
        .unwrap();
        assert_eq!(n, names());
    }
}
