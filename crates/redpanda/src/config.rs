//! Redpanda configuration.

use serde::{Deserialize, Serialize};

/// Redpanda publisher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses
    pub brokers: Vec<String>,
    /// Topic readings are published to
    #[serde(default)]
    pub topic: String,
    /// Partition to produce into
    #[serde(default)]
    pub partition: i32,
    /// Compression type (none, gzip, snappy, lz4, zstd)
    #[serde(default = "default_compression")]
    pub compression: String,
    /// SASL username (enables TLS + SCRAM-SHA-256 together with the password)
    #[serde(default)]
    pub sasl_username: Option<String>,
    /// SASL password
    #[serde(default)]
    pub sasl_password: Option<String>,
}

fn default_compression() -> String {
    "none".to_string()
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: String::new(),
            partition: 0,
            compression: default_compression(),
            sasl_username: None,
            sasl_password: None,
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    /// Checks the identifiers the publisher cannot run without.
    pub fn validate(&self) -> Result<(), String> {
        if self.brokers.iter().all(|b| b.trim().is_empty()) {
            return Err("redpanda.brokers must list at least one broker".into());
        }
        if self.topic.trim().is_empty() {
            return Err("redpanda.topic is required".into());
        }
        Ok(())
    }
}
