//! Watermark persisted as a row in ClickHouse.
//!
//! Writes are plain inserts into a `ReplacingMergeTree`; the row with the
//! highest version wins. There is no conditional write, so two jobs racing
//! on the same window both succeed and the later insert wins.

use crate::client::ClickHouseClient;
use crate::config::validate_identifier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use pipeline_core::{Error, Result, StoredWatermark, Watermark, WatermarkStore};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
struct WatermarkRow {
    kind: String,
    name: String,
    range_start: i64,
    range_end: i64,
    execution_time: i64,
    version: u64,
}

fn from_millis(field: &str, millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::watermark(format!("{} {} ms is out of range", field, millis)))
}

impl WatermarkRow {
    fn into_stored(self) -> Result<StoredWatermark> {
        let watermark = Watermark {
            range_start: from_millis("rangeStart", self.range_start)?,
            range_end: from_millis("rangeEnd", self.range_end)?,
            execution_time: from_millis("executionTime", self.execution_time)?,
        };
        Ok(StoredWatermark::new(watermark, Some(self.version.to_string())))
    }
}

/// Next version for a write that follows `previous`.
fn next_version(watermark: &Watermark, previous: Option<&StoredWatermark>) -> u64 {
    let previous = previous
        .and_then(|p| p.version.as_deref())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    let by_time = watermark.execution_time.timestamp_millis().max(0) as u64;
    by_time.max(previous + 1)
}

/// [`WatermarkStore`] over a ClickHouse table.
pub struct ClickHouseWatermarkStore {
    client: ClickHouseClient,
    table: String,
    kind: String,
    name: String,
}

impl ClickHouseWatermarkStore {
    /// `table` lives in the client's database and must be a plain identifier.
    pub fn new(
        client: ClickHouseClient,
        table: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let table = table.into();
        validate_identifier("watermark table", &table).map_err(Error::validation)?;

        Ok(Self {
            client,
            table,
            kind: kind.into(),
            name: name.into(),
        })
    }

    fn qualified_table(&self) -> String {
        format!("{}.{}", self.client.config().database, self.table)
    }

    /// DDL for the backing table.
    pub fn create_table_sql(&self) -> String {
        crate::schema::create_watermark_table(&self.client.config().database, &self.table)
    }
}

#[async_trait]
impl WatermarkStore for ClickHouseWatermarkStore {
    async fn load(&self) -> Result<Option<StoredWatermark>> {
        let sql = format!(
            "SELECT kind, name, \
             toUnixTimestamp64Milli(range_start) AS range_start, \
             toUnixTimestamp64Milli(range_end) AS range_end, \
             toUnixTimestamp64Milli(execution_time) AS execution_time, \
             version \
             FROM {} FINAL WHERE kind = ? AND name = ? LIMIT 1",
            self.qualified_table()
        );

        let row = self
            .client
            .inner()
            .query(&sql)
            .bind(&self.kind)
            .bind(&self.name)
            .fetch_optional::<WatermarkRow>()
            .await
            .map_err(|e| Error::watermark(format!("Failed to read watermark: {}", e)))?;

        row.map(WatermarkRow::into_stored).transpose()
    }

    async fn store(
        &self,
        watermark: &Watermark,
        previous: Option<&StoredWatermark>,
    ) -> Result<()> {
        let row = WatermarkRow {
            kind: self.kind.clone(),
            name: self.name.clone(),
            range_start: watermark.range_start.timestamp_millis(),
            range_end: watermark.range_end.timestamp_millis(),
            execution_time: watermark.execution_time.timestamp_millis(),
            version: next_version(watermark, previous),
        };

        let mut insert = self
            .client
            .inner()
            .insert::<WatermarkRow>(&self.qualified_table())
            .map_err(|e| Error::watermark(format!("Failed to create insert: {}", e)))?;

        insert
            .write(&row)
            .await
            .map_err(|e| Error::watermark(format!("Failed to write watermark: {}", e)))?;

        insert
            .end()
            .await
            .map_err(|e| Error::watermark(format!("Failed to commit watermark: {}", e)))?;

        info!(
            kind = %self.kind,
            name = %self.name,
            range_end = %watermark.range_end,
            version = row.version,
            "Stored watermark"
        );
        Ok(())
    }
}
