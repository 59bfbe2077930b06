//! Concurrent publishing of one message per reading.

use pipeline_core::{Error, Result};
use redpanda::Publisher;
use std::sync::Arc;
use telemetry::metrics;
use tokio::task::JoinSet;

/// Publishes every payload on its own task and waits for all of them.
///
/// Returns on the first failure and aborts the publishes still running.
/// Messages already acknowledged stay on the queue.
pub async fn publish_each(publisher: Arc<dyn Publisher>, payloads: Vec<Vec<u8>>) -> Result<usize> {
    let mut tasks = JoinSet::new();

    for payload in payloads {
        let publisher = publisher.clone();
        tasks.spawn(async move {
            let _in_flight = metrics().publishes_in_flight.track();
            publisher.publish(payload).await
        });
    }

    let mut published = 0;
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .map_err(|e| Error::internal(format!("publish task failed: {}", e)))
            .and_then(|result| result);

        if let Err(e) = outcome {
            tasks.abort_all();
            return Err(e);
        }
        published += 1;
    }

    Ok(published)
}
