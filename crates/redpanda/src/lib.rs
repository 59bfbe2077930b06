//! Redpanda publisher for the reading relays.

pub mod config;
pub mod connection;
pub mod health;
pub mod producer;

pub use config::*;
pub use producer::*;
