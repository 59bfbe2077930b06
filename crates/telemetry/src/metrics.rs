//! In-process metrics.
//!
//! Plain atomics behind a process-wide registry. The receiver logs a
//! snapshot on shutdown and the aggregator logs one when the job ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::Duration;

/// Monotonic count.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Current level of something, e.g. publishes in flight.
///
/// Signed so an unbalanced `dec` shows up as a negative value instead of
/// wrapping.
#[derive(Debug, Default)]
pub struct Gauge(AtomicI64);

impl Gauge {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Increments now and decrements when the guard drops, including when
    /// the owning task is aborted.
    pub fn track(&'static self) -> GaugeGuard {
        self.inc();
        GaugeGuard(self)
    }
}

#[must_use = "the gauge is decremented as soon as the guard is dropped"]
pub struct GaugeGuard(&'static Gauge);

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Bucket bounds for per-request work.
pub const REQUEST_BOUNDS_MS: &[u64] = &[1, 5, 10, 25, 50, 100, 250, 500, 1_000, 5_000];

/// Bucket bounds for export stages, which run for seconds to minutes.
pub const JOB_BOUNDS_MS: &[u64] = &[100, 500, 1_000, 5_000, 15_000, 60_000, 300_000, 900_000];

/// Latency histogram in milliseconds.
///
/// Values above the last bound land in an overflow bucket.
#[derive(Debug)]
pub struct Histogram {
    bounds: &'static [u64],
    buckets: Vec<AtomicU64>,
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    pub fn with_bounds(bounds: &'static [u64]) -> Self {
        Self {
            bounds,
            buckets: (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = self
            .bounds
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(self.bounds.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_duration(&self, elapsed: Duration) {
        self.observe(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// `(upper bound, count)` pairs; the overflow bucket has bound `None`.
    pub fn buckets(&self) -> Vec<(Option<u64>, u64)> {
        self.bounds
            .iter()
            .map(|&b| Some(b))
            .chain(std::iter::once(None))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let count = self.count();
        let sum = self.sum.load(Ordering::Relaxed);
        HistogramSnapshot {
            count,
            mean_ms: if count == 0 { 0.0 } else { sum as f64 / count as f64 },
            max_ms: self.max.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub mean_ms: f64,
    pub max_ms: u64,
}

/// Metrics for both binaries. Each process only moves its own half.
#[derive(Debug)]
pub struct Metrics {
    // Relay
    pub requests_received: Counter,
    pub requests_rejected: Counter,
    pub readings_received: Counter,
    pub messages_published: Counter,
    pub publish_errors: Counter,
    pub publishes_in_flight: Gauge,
    pub request_latency_ms: Histogram,
    pub publish_latency_ms: Histogram,

    // Export job
    pub windows_exported: Counter,
    pub rows_exported: Counter,
    pub bytes_exported: Counter,
    pub query_latency_ms: Histogram,
    pub upload_latency_ms: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            requests_received: Counter::default(),
            requests_rejected: Counter::default(),
            readings_received: Counter::default(),
            messages_published: Counter::default(),
            publish_errors: Counter::default(),
            publishes_in_flight: Gauge::default(),
            request_latency_ms: Histogram::with_bounds(REQUEST_BOUNDS_MS),
            publish_latency_ms: Histogram::with_bounds(REQUEST_BOUNDS_MS),
            windows_exported: Counter::default(),
            rows_exported: Counter::default(),
            bytes_exported: Counter::default(),
            query_latency_ms: Histogram::with_bounds(JOB_BOUNDS_MS),
            upload_latency_ms: Histogram::with_bounds(JOB_BOUNDS_MS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySnapshot {
    pub requests_received: u64,
    pub requests_rejected: u64,
    pub readings_received: u64,
    pub messages_published: u64,
    pub publish_errors: u64,
    pub publishes_in_flight: i64,
    pub request_latency: HistogramSnapshot,
    pub publish_latency: HistogramSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub windows_exported: u64,
    pub rows_exported: u64,
    pub bytes_exported: u64,
    pub query_latency: HistogramSnapshot,
    pub upload_latency: HistogramSnapshot,
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub relay: RelaySnapshot,
    pub export: ExportSnapshot,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            relay: RelaySnapshot {
                requests_received: self.requests_received.get(),
                requests_rejected: self.requests_rejected.get(),
                readings_received: self.readings_received.get(),
                messages_published: self.messages_published.get(),
                publish_errors: self.publish_errors.get(),
                publishes_in_flight: self.publishes_in_flight.get(),
                request_latency: self.request_latency_ms.snapshot(),
                publish_latency: self.publish_latency_ms.snapshot(),
            },
            export: ExportSnapshot {
                windows_exported: self.windows_exported.get(),
                rows_exported: self.rows_exported.get(),
                bytes_exported: self.bytes_exported.get(),
                query_latency: self.query_latency_ms.snapshot(),
                upload_latency: self.upload_latency_ms.snapshot(),
            },
        }
    }
}

static METRICS: LazyLock<Metrics> = LazyLock::new(Metrics::default);

/// Process-wide metrics.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
