//! Reading submission endpoint.
//!
//! Both relays accept `{"data": [{"timestamp": RFC3339, "value": "<float>"}]}`.
//! The temperature relay publishes one `{timestamp, temperature}` message
//! per reading; the data-sequence relay publishes the whole request as a
//! single `{data: [...]}` message. Either the whole request is relayed or
//! the client gets an error.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::Method,
    http::StatusCode,
};
use pipeline_core::{
    limits::MAX_BODY_SIZE_BYTES,
    schema::{parse_request, readings_from_request},
    DataSequence, Error, Reading, RelayVariant, TemperatureReading,
};
use serde::Serialize;
use std::time::Instant;
use telemetry::metrics;
use tracing::info;

use crate::fanout::publish_each;
use crate::response::ApiError;
use crate::state::AppState;

/// POST /temperature or POST /dataSequence.
pub async fn readings_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    let start = Instant::now();

    metrics().requests_received.inc();

    let readings = body
        .map_err(body_error)
        .and_then(|body| parse_readings(&body))
        .inspect_err(|_| metrics().requests_rejected.inc())?;
    let count = readings.len();
    metrics().readings_received.inc_by(count as u64);

    let published = match state.variant {
        RelayVariant::Temperature => {
            let payloads = readings
                .into_iter()
                .map(|r| encode(&TemperatureReading::from(r)))
                .collect::<Result<Vec<_>, _>>()?;
            publish_each(state.publisher.clone(), payloads).await?
        }
        RelayVariant::DataSequence => {
            let payload = encode(&DataSequence::from(readings))?;
            state.publisher.publish(payload).await?;
            1
        }
    };

    let latency_ms = start.elapsed().as_millis() as u64;
    metrics().request_latency_ms.observe(latency_ms);

    info!(
        variant = state.variant.as_str(),
        readings = count,
        messages = published,
        latency_ms = latency_ms,
        "Readings relayed"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Any method other than POST on the data endpoint.
pub async fn method_not_allowed(method: Method) -> ApiError {
    metrics().requests_rejected.inc();
    Error::MethodNotAllowed(method.to_string()).into()
}

/// A body that could not be buffered is the client's fault, whatever
/// status axum would have picked.
fn body_error(rejection: BytesRejection) -> Error {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::validation(format!("body exceeds {}KB limit", MAX_BODY_SIZE_BYTES / 1024))
    } else {
        Error::validation(rejection.body_text())
    }
}

fn parse_readings(body: &[u8]) -> Result<Vec<Reading>, Error> {
    let request = parse_request(body)?;
    readings_from_request(request)
}

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(message)
        .map_err(|e| Error::internal(format!("Failed to encode message: {}", e)))
}
