//! Redpanda producer using rskafka.

use crate::config::RedpandaConfig;
use crate::connection::{compression, connect};
use async_trait::async_trait;
use chrono::Utc;
use pipeline_core::{Error, Result};
use rskafka::client::partition::{PartitionClient, UnknownTopicHandling};
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Where a published message landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub partition: i32,
    pub offset: i64,
}

/// Publishes one message to the readings topic.
///
/// The relays only depend on this trait, so tests swap in an in-memory
/// publisher.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes a single serialized message and waits for the broker ack.
    async fn publish(&self, payload: Vec<u8>) -> Result<PublishReceipt>;

    /// Whether the last publish attempt succeeded. False before the first one.
    fn is_healthy(&self) -> bool;
}

/// Producer for a single topic partition.
pub struct Producer {
    config: RedpandaConfig,
    /// Cached partition client, dropped after a failed produce
    client: RwLock<Option<Arc<PartitionClient>>>,
    healthy: AtomicBool,
}

impl Producer {
    /// Creates a new producer. The connection is opened on first publish.
    pub fn new(config: RedpandaConfig) -> Self {
        info!(
            brokers = %config.broker_string(),
            topic = %config.topic,
            partition = config.partition,
            "Creating Redpanda producer"
        );

        Self {
            config,
            client: RwLock::new(None),
            healthy: AtomicBool::new(false),
        }
    }

    /// Gets or creates the partition client.
    async fn get_client(&self) -> Result<Arc<PartitionClient>> {
        // Check cache first
        {
            let client = self.client.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let mut guard = self.client.write().await;
        // Another publish may have connected while we waited for the lock
        if let Some(ref c) = *guard {
            return Ok(c.clone());
        }

        let client = connect(&self.config)
            .await
            .map_err(|e| Error::publish(format!("Failed to connect to Redpanda: {}", e)))?;

        let partition_client = client
            .partition_client(
                self.config.topic.clone(),
                self.config.partition,
                UnknownTopicHandling::Error,
            )
            .await
            .map_err(|e| Error::publish(format!("Failed to get partition client: {}", e)))?;

        let partition_client = Arc::new(partition_client);
        *guard = Some(partition_client.clone());

        Ok(partition_client)
    }

    fn mark_healthy(&self) {
        if !self.healthy.swap(true, Ordering::Relaxed) {
            health().redpanda.set_healthy();
        }
    }

    fn mark_unhealthy(&self, reason: &str) {
        self.healthy.store(false, Ordering::Relaxed);
        health().redpanda.set_unhealthy(reason);
    }

    /// Drops the cached connection so the next publish reconnects.
    pub async fn reset_connection(&self) {
        let mut client = self.client.write().await;
        *client = None;
        debug!("Producer connection reset");
    }
}

#[async_trait]
impl Publisher for Producer {
    async fn publish(&self, payload: Vec<u8>) -> Result<PublishReceipt> {
        let start = Instant::now();
        let client = self.get_client().await.inspect_err(|_| {
            metrics().publish_errors.inc();
            self.mark_unhealthy("connection failed");
        })?;

        let record = Record {
            key: None,
            value: Some(payload),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let produced = client
            .produce(vec![record], compression(&self.config.compression))
            .await;

        match produced {
            Ok(offsets) => {
                let offset = offsets.first().copied().unwrap_or(-1);
                let elapsed = start.elapsed();

                metrics().messages_published.inc();
                metrics().publish_latency_ms.observe_duration(elapsed);
                self.mark_healthy();

                debug!(
                    topic = %self.config.topic,
                    partition = self.config.partition,
                    offset = offset,
                    latency_ms = %elapsed.as_millis(),
                    "Published message"
                );

                Ok(PublishReceipt {
                    partition: self.config.partition,
                    offset,
                })
            }
            Err(e) => {
                error!(topic = %self.config.topic, "Failed to publish to Redpanda: {}", e);
                metrics().publish_errors.inc();
                self.mark_unhealthy("produce failed");
                self.reset_connection().await;
                Err(Error::publish(format!("Failed to produce: {}", e)))
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}
