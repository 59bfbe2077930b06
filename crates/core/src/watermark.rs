//! Job progress record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::window::Window;

/// Default kind of the singleton watermark record.
pub const DEFAULT_WATERMARK_KIND: &str = "aggregator";

/// Default name of the singleton watermark record.
pub const DEFAULT_WATERMARK_NAME: &str = "lastExecution";

/// Bounds of the last exported window and when the export ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
    pub execution_time: DateTime<Utc>,
}

impl Watermark {
    /// Watermark recording that `window` was exported at `executed_at`.
    pub fn for_window(window: &Window, executed_at: DateTime<Utc>) -> Self {
        Self {
            range_start: window.start(),
            range_end: window.end(),
            execution_time: executed_at,
        }
    }
}

/// A watermark as read from a store, with the store's version token.
///
/// The token is opaque; stores that support conditional writes use it
/// to detect a concurrent update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredWatermark {
    pub watermark: Watermark,
    pub version: Option<String>,
}

impl StoredWatermark {
    pub fn new(watermark: Watermark, version: Option<String>) -> Self {
        Self { watermark, version }
    }
}

/// Persists the singleton watermark between job runs.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Reads the current watermark. `None` means the job never succeeded.
    async fn load(&self) -> Result<Option<StoredWatermark>>;

    /// Replaces the watermark. `previous` is what `load` returned in the
    /// same run; stores with conditional writes refuse the write if the
    /// record changed since.
    async fn store(&self, watermark: &Watermark, previous: Option<&StoredWatermark>)
        -> Result<()>;
}
