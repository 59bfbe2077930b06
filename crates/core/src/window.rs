//! Hourly export windows and the planner that picks the next one.
//!
//! Windows are half-open `[start, end)`, exactly one hour long, with both
//! bounds on the top of a UTC hour. Successive runs advance one window at
//! a time, so the exported sequence has no gaps and no overlaps.

use std::fmt;

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::watermark::Watermark;

/// Length of every export window.
pub fn window_length() -> Duration {
    Duration::hours(1)
}

/// Truncates a timestamp to the top of its UTC hour.
pub fn truncate_to_hour(ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
    ts.duration_trunc(window_length())
        .map_err(|e| Error::internal(format!("cannot truncate {} to the hour: {}", ts, e)))
}

/// A half-open, hour-aligned `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    /// The window that ends at the top of the hour containing `end`.
    pub fn ending_at(end: DateTime<Utc>) -> Result<Self> {
        let end = truncate_to_hour(end)?;
        let start = end
            .checked_sub_signed(window_length())
            .ok_or_else(|| Error::internal(format!("window ending {} is out of range", end)))?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `ts` falls inside `[start, end)`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Blob name for this window: the end timestamp as `YYYYMMDDHHMMSS.jsonl`.
    ///
    /// Fixed width, so lexical order is chronological order.
    pub fn object_name(&self) -> String {
        self.end.format("%Y%m%d%H%M%S.jsonl").to_string()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

/// What the planner decided for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextWindow {
    /// This window has fully elapsed and has not been exported yet.
    Due(Window),
    /// The hour after the last export has not finished yet.
    NotYetElapsed { next_end: DateTime<Utc> },
}

/// Computes the next window to export.
///
/// Without a watermark the most recent fully elapsed hour is due. With one,
/// the hour right after `range_end` is due once `now` has reached its end.
pub fn compute_next_window(last: Option<&Watermark>, now: DateTime<Utc>) -> Result<NextWindow> {
    let end = match last {
        None => truncate_to_hour(now)?,
        Some(watermark) => {
            let next = watermark
                .range_end
                .checked_add_signed(window_length())
                .ok_or_else(|| {
                    Error::internal(format!(
                        "watermark end {} is out of range",
                        watermark.range_end
                    ))
                })?;
            let end = truncate_to_hour(next)?;

            if end > now {
                return Ok(NextWindow::NotYetElapsed { next_end: end });
            }
            end
        }
    };

    Ok(NextWindow::Due(Window::ending_at(end)?))
}
