//! ClickHouse table schemas.
//!
//! The landing table is filled by whatever drains the readings topic. The
//! optional Kafka engine feed below is one way to do that inside ClickHouse
//! itself. `publish_time` is the instant the reading reached the queue, and
//! it is the column the hourly export filters on.

use crate::config::ClickHouseConfig;

/// Landing table for readings.
pub fn create_readings_table(database: &str, table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{table} (
    timestamp DateTime64(3, 'UTC'),
    temperature Float64,
    publish_time DateTime64(3, 'UTC') DEFAULT now64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(publish_time)
ORDER BY publish_time
SETTINGS index_granularity = 8192
"#
    )
}

/// Kafka engine table reading the `{timestamp, temperature}` messages the
/// temperature relay publishes.
pub fn create_kafka_queue_table(
    database: &str,
    table: &str,
    brokers: &str,
    topic: &str,
    group: &str,
) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{table}_queue (
    timestamp DateTime64(3, 'UTC'),
    temperature Float64
)
ENGINE = Kafka
SETTINGS
    kafka_broker_list = '{brokers}',
    kafka_topic_list = '{topic}',
    kafka_group_name = '{group}',
    kafka_format = 'JSONEachRow',
    date_time_input_format = 'best_effort'
"#
    )
}

/// Materialized view moving queued messages into the landing table.
///
/// The broker's append time stands in for the publish time.
pub fn create_kafka_view(database: &str, table: &str) -> String {
    format!(
        r#"
CREATE MATERIALIZED VIEW IF NOT EXISTS {database}.{table}_mv TO {database}.{table} AS
SELECT
    timestamp,
    temperature,
    coalesce(_timestamp_ms, now64(3)) AS publish_time
FROM {database}.{table}_queue
"#
    )
}

/// Watermark table for the ClickHouse-backed watermark store.
///
/// One logical row per `(kind, name)`; the highest `version` wins on merge.
/// Readers must use `FINAL`.
pub fn create_watermark_table(database: &str, table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{table} (
    kind LowCardinality(String),
    name String,
    range_start DateTime64(3, 'UTC'),
    range_end DateTime64(3, 'UTC'),
    execution_time DateTime64(3, 'UTC'),
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY (kind, name)
"#
    )
}

/// DDL the export job needs: the landing table.
pub fn all_tables(config: &ClickHouseConfig) -> Vec<String> {
    vec![create_readings_table(&config.database, &config.table)]
}
