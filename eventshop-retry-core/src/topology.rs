//! Exchange and queue layout that makes delayed retry work without a scheduler.
//!
//! Messages published to the retry queue carry a TTL. When it expires the
//! broker dead-letters them to `main_exchange` / `main_routing_key`, which
//! puts them back on the main queue.

use std::fmt;

use tracing::{debug, info};

use crate::bus::{DeadLetter, QueueSpec, RetryBroker};
use crate::config::{RetryConfig, RetryOptions, TopologyNames};
use crate::RetryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyStep {
    DeclareMainExchange,
    DeclareMainQueue,
    BindMainQueue,
    DeclareRetryQueue,
    BindRetryQueue,
}

impl fmt::Display for TopologyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TopologyStep::DeclareMainExchange => "mainExchange ExchangeDeclare",
            TopologyStep::DeclareMainQueue => "mainQueue QueueDeclare",
            TopologyStep::BindMainQueue => "mainQueue QueueBind",
            TopologyStep::DeclareRetryQueue => "retryQueue QueueDeclare",
            TopologyStep::BindRetryQueue => "retryQueue QueueBind",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyAction {
    DeclareExchange {
        name: String,
    },
    DeclareQueue(QueueSpec),
    Bind {
        queue: String,
        exchange: String,
        routing_key: String,
    },
}

/// Ordered declarations for one retry topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyPlan {
    steps: Vec<(TopologyStep, TopologyAction)>,
}

impl TopologyPlan {
    pub fn for_names(names: &TopologyNames) -> Self {
        let steps = vec![
            (
                TopologyStep::DeclareMainExchange,
                TopologyAction::DeclareExchange {
                    name: names.main_exchange.clone(),
                },
            ),
            (
                TopologyStep::DeclareMainQueue,
                TopologyAction::DeclareQueue(QueueSpec {
                    name: names.main_queue.clone(),
                    durable: true,
                    quorum: true,
                    dead_letter: None,
                }),
            ),
            (
                TopologyStep::BindMainQueue,
                TopologyAction::Bind {
                    queue: names.main_queue.clone(),
                    exchange: names.main_exchange.clone(),
                    routing_key: names.main_routing_key.clone(),
                },
            ),
            (
                TopologyStep::DeclareRetryQueue,
                TopologyAction::DeclareQueue(QueueSpec {
                    name: names.retry_queue.clone(),
                    durable: true,
                    quorum: true,
                    dead_letter: Some(DeadLetter {
                        exchange: names.main_exchange.clone(),
                        routing_key: names.main_routing_key.clone(),
                    }),
                }),
            ),
            (
                TopologyStep::BindRetryQueue,
                TopologyAction::Bind {
                    queue: names.retry_queue.clone(),
                    exchange: names.main_exchange.clone(),
                    routing_key: names.retry_routing_key.clone(),
                },
            ),
        ];
        Self { steps }
    }

    pub fn steps(&self) -> &[(TopologyStep, TopologyAction)] {
        &self.steps
    }

    /// Runs every step in order, stopping at the first failure. Nothing is
    /// rolled back; declarations are idempotent so re-running is safe.
    pub async fn apply<B>(&self, broker: &B) -> Result<(), RetryError>
    where
        B: RetryBroker + ?Sized,
    {
        for (step, action) in &self.steps {
            debug!("topology step: {step}");
            let res = match action {
                TopologyAction::DeclareExchange { name } => {
                    broker.declare_direct_exchange(name).await
                }
                TopologyAction::DeclareQueue(spec) => broker.declare_queue(spec).await,
                TopologyAction::Bind {
                    queue,
                    exchange,
                    routing_key,
                } => broker.bind_queue(queue, exchange, routing_key).await,
            };
            res.map_err(|e| RetryError::Topology {
                step: *step,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

pub async fn declare_topology<B>(broker: &B, names: &TopologyNames) -> Result<(), RetryError>
where
    B: RetryBroker + ?Sized,
{
    TopologyPlan::for_names(names).apply(broker).await?;
    info!(
        "retry topology ready. exchange={} queue={} retry_queue={}",
        names.main_exchange, names.main_queue, names.retry_queue
    );
    Ok(())
}

/// Validates the options, declares the topology and returns the config to
/// retry with.
pub async fn init<B>(
    broker: &B,
    names: TopologyNames,
    options: RetryOptions,
) -> Result<RetryConfig, RetryError>
where
    B: RetryBroker + ?Sized,
{
    let config = RetryConfig::new(names, options)?;
    declare_topology(broker, config.names()).await?;
    Ok(config)
}
