//! Hourly export of published readings.
//!
//! One run reads the watermark, plans the next window, pulls that window's
//! rows from ClickHouse, writes them as an NDJSON object, and only then
//! advances the watermark.

pub mod export;
pub mod job;
pub mod store;
pub mod watermark;

pub use export::{ExportSummary, Exporter};
pub use job::{ExportJob, JobOutcome};
pub use store::{open_store, StoreLocation};
pub use watermark::ObjectWatermarkStore;
