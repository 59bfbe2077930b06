//! One run of the hourly export.

use crate::export::Exporter;
use chrono::{DateTime, Utc};
use clickhouse_client::WindowQuery;
use object_store::path::Path;
use pipeline_core::{
    compute_next_window, NextWindow, Result, Watermark, WatermarkStore, Window,
};
use std::sync::Arc;
use telemetry::metrics;
use tracing::info;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The next window has not fully elapsed; nothing was touched.
    NothingToDo,
    /// The window was exported and the watermark advanced.
    Exported {
        window: Window,
        object: Path,
        rows: u64,
        bytes: u64,
    },
}

/// Read watermark, plan, query, export, write watermark. Strictly in that
/// order; the watermark is written only after the object is complete.
pub struct ExportJob {
    query: Arc<dyn WindowQuery>,
    exporter: Exporter,
    watermarks: Arc<dyn WatermarkStore>,
}

impl ExportJob {
    pub fn new(
        query: Arc<dyn WindowQuery>,
        exporter: Exporter,
        watermarks: Arc<dyn WatermarkStore>,
    ) -> Self {
        Self {
            query,
            exporter,
            watermarks,
        }
    }

    /// Exports at most one window, the first one after the watermark that
    /// ended at or before `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<JobOutcome> {
        let previous = self.watermarks.load().await?;

        let window = match compute_next_window(previous.as_ref().map(|p| &p.watermark), now)? {
            NextWindow::Due(window) => window,
            NextWindow::NotYetElapsed { next_end } => {
                info!(
                    next_end = %next_end,
                    now = %now,
                    "Next window has not elapsed yet, nothing to do"
                );
                return Ok(JobOutcome::NothingToDo);
            }
        };

        info!(window = %window, first_run = previous.is_none(), "Exporting window");

        let rows = self.query.fetch_window(&window).await?;
        let summary = self
            .exporter
            .export_window(&window.object_name(), rows)
            .await?;

        self.watermarks
            .store(&Watermark::for_window(&window, now), previous.as_ref())
            .await?;

        metrics().windows_exported.inc();

        info!(
            window = %window,
            object = %summary.location,
            rows = summary.rows,
            bytes = summary.bytes,
            "Window exported"
        );

        Ok(JobOutcome::Exported {
            window,
            object: summary.location,
            rows: summary.rows,
            bytes: summary.bytes,
        })
    }
}
