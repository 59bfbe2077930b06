//! Request validation for the relays.

use validator::Validate;

use crate::error::{Error, Result};
use crate::limits::{MAX_BODY_SIZE_BYTES, MAX_READINGS_PER_REQUEST};
use crate::reading::{RawReading, Reading, ReadingBatchRequest};

/// Validates raw body size BEFORE deserialization.
pub fn validate_body_size(raw_bytes: &[u8]) -> Result<()> {
    if raw_bytes.len() > MAX_BODY_SIZE_BYTES {
        return Err(Error::validation(format!(
            "body {}KB exceeds {}KB limit",
            raw_bytes.len() / 1024,
            MAX_BODY_SIZE_BYTES / 1024
        )));
    }
    Ok(())
}

/// Decodes and validates a relay request body.
pub fn parse_request(raw_bytes: &[u8]) -> Result<ReadingBatchRequest> {
    validate_body_size(raw_bytes)?;

    let request: ReadingBatchRequest = serde_json::from_slice(raw_bytes)?;

    request.validate().map_err(|_| {
        Error::validation(format!(
            "batch has {} readings, exceeds {} limit",
            request.data.len(),
            MAX_READINGS_PER_REQUEST
        ))
    })?;

    Ok(request)
}

/// Converts every raw reading, failing the whole batch on the first
/// value that is not a 64-bit float.
pub fn readings_from_request(request: ReadingBatchRequest) -> Result<Vec<Reading>> {
    request
        .data
        .into_iter()
        .enumerate()
        .map(|(index, raw)| parse_reading(index, raw))
        .collect()
}

fn parse_reading(index: usize, raw: RawReading) -> Result<Reading> {
    let value = raw
        .value
        .parse::<f64>()
        .map_err(|source| Error::InvalidValue {
            index,
            value: raw.value.clone(),
            source,
        })?;

    // NaN and infinities have no JSON representation downstream
    if !value.is_finite() {
        return Err(Error::validation(format!(
            "data[{}].value {:?} is not finite",
            index, raw.value
        )));
    }

    Ok(Reading {
        timestamp: raw.timestamp,
        value,
    })
}
