//! Reading types as they arrive over HTTP, travel over the queue, and
//! come back out of the analytical store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// A reading as posted by a client. The value is still a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReading {
    pub timestamp: DateTime<Utc>,
    pub value: String,
}

/// Request body accepted by both relay endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReadingBatchRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(max = 10000))]
    pub data: Vec<RawReading>,
}

/// `"data": null` reads as an empty batch, same as a missing field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<RawReading>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<RawReading>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A validated reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One reading published as its own message by the fan-out relay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
}

impl From<Reading> for TemperatureReading {
    fn from(reading: Reading) -> Self {
        Self {
            timestamp: reading.timestamp,
            temperature: reading.value,
        }
    }
}

/// A whole request published as a single message by the batch relay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSequence {
    pub data: Vec<Reading>,
}

impl From<Vec<Reading>> for DataSequence {
    fn from(data: Vec<Reading>) -> Self {
        Self { data }
    }
}

/// A row read back from the analytical store for one window.
///
/// Lives only between the range query and the upload.
pub type ExportedRow = TemperatureReading;

/// Which relay a receiver process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayVariant {
    /// `POST /temperature`, one message per reading, published concurrently.
    #[default]
    Temperature,
    /// `POST /dataSequence`, one message per request.
    DataSequence,
}

impl RelayVariant {
    /// Route the variant's data endpoint is mounted on.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Temperature => "/temperature",
            Self::DataSequence => "/dataSequence",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::DataSequence => "data_sequence",
        }
    }
}
