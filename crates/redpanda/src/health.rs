//! Redpanda health checks.

use crate::config::RedpandaConfig;
use crate::connection::connect;
use tracing::{debug, error, warn};

/// Check Redpanda connection health.
///
/// Healthy means the brokers answered and the configured topic exists.
pub async fn check_connection(config: &RedpandaConfig) -> bool {
    let client = match connect(config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to Redpanda: {}", e);
            return false;
        }
    };

    match client.list_topics().await {
        Ok(topics) => {
            let found = topics.iter().any(|t| t.name == config.topic);
            if found {
                debug!(topics = topics.len(), "Redpanda connection healthy");
            } else {
                warn!(topic = %config.topic, "Redpanda topic does not exist");
            }
            found
        }
        Err(e) => {
            error!("Failed to list Redpanda topics: {}", e);
            false
        }
    }
}
