//! ClickHouse access for the hourly export job.

pub mod client;
pub mod config;
pub mod health;
pub mod schema;
pub mod watermark;
pub mod window;

pub use client::*;
pub use config::*;
pub use watermark::ClickHouseWatermarkStore;
pub use window::*;
