//! Reading relays and the hourly NDJSON export job.
//!
//! The `receiver` binary serves one of the two relays; the `aggregator`
//! binary runs a single export and exits.

pub mod config;
