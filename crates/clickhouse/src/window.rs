//! Range query over the readings table for one export window.

use crate::client::ClickHouseClient;
use async_trait::async_trait;
use chrono::DateTime;
use clickhouse::query::RowCursor;
use clickhouse::Row;
use pipeline_core::{Error, ExportedRow, Result, Window};
use serde::Deserialize;
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

/// Lazy, single-pass cursor over the rows of one window.
#[async_trait]
pub trait WindowRows: Send {
    /// Next row in `publish_time` order, `None` once exhausted.
    async fn next_row(&mut self) -> Result<Option<ExportedRow>>;
}

/// Fetches the readings published inside a window.
#[async_trait]
pub trait WindowQuery: Send + Sync {
    /// Starts the query. Rows are pulled through the returned cursor.
    async fn fetch_window(&self, window: &Window) -> Result<Box<dyn WindowRows>>;
}

/// A reading row as ClickHouse returns it. Timestamps are epoch millis.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct ReadingRow {
    pub timestamp: i64,
    pub temperature: f64,
}

impl TryFrom<ReadingRow> for ExportedRow {
    type Error = Error;

    fn try_from(row: ReadingRow) -> Result<Self> {
        let timestamp = DateTime::from_timestamp_millis(row.timestamp).ok_or_else(|| {
            Error::query(format!("timestamp {} ms is out of range", row.timestamp))
        })?;

        Ok(ExportedRow {
            timestamp,
            temperature: row.temperature,
        })
    }
}

/// Builds the range query for a readings table.
pub fn window_query_sql(qualified_table: &str) -> String {
    format!(
        "SELECT toUnixTimestamp64Milli(timestamp) AS timestamp, temperature \
         FROM {} \
         WHERE publish_time >= fromUnixTimestamp64Milli(toInt64(?), 'UTC') \
         AND publish_time < fromUnixTimestamp64Milli(toInt64(?), 'UTC') \
         ORDER BY publish_time",
        qualified_table
    )
}

/// [`WindowQuery`] against the configured readings table.
#[derive(Clone)]
pub struct ClickHouseWindowQuery {
    client: ClickHouseClient,
}

impl ClickHouseWindowQuery {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WindowQuery for ClickHouseWindowQuery {
    async fn fetch_window(&self, window: &Window) -> Result<Box<dyn WindowRows>> {
        let sql = window_query_sql(&self.client.readings_table());

        let cursor = self
            .client
            .inner()
            .query(&sql)
            .bind(window.start().timestamp_millis())
            .bind(window.end().timestamp_millis())
            .fetch::<ReadingRow>()
            .map_err(|e| Error::query(format!("Failed to start window query: {}", e)))?;

        debug!(window = %window, "Started window query");

        Ok(Box::new(ClickHouseRows {
            cursor,
            rows: 0,
            started: Instant::now(),
        }))
    }
}

struct ClickHouseRows {
    cursor: RowCursor<ReadingRow>,
    rows: u64,
    started: Instant,
}

#[async_trait]
impl WindowRows for ClickHouseRows {
    async fn next_row(&mut self) -> Result<Option<ExportedRow>> {
        let next = self
            .cursor
            .next()
            .await
            .map_err(|e| Error::query(format!("Failed to read window rows: {}", e)))?;

        match next {
            Some(row) => {
                self.rows += 1;
                ExportedRow::try_from(row).map(Some)
            }
            None => {
                metrics()
                    .query_latency_ms
                    .observe_duration(self.started.elapsed());
                debug!(rows = self.rows, "Window query exhausted");
                Ok(None)
            }
        }
    }
}
