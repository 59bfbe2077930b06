//! Unified error types for the reading pipeline.
//!
//! Client input errors map to 400, everything touching the queue, the
//! analytical store, the blob store or the watermark store maps to 500.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the reading pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    /// A reading value that is not a 64-bit float.
    #[error("data[{index}].value {value:?} is not a number: {source}")]
    InvalidValue {
        index: usize,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("{0} not allowed")]
    MethodNotAllowed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("upload error: {0}")]
    Upload(String),

    #[error("watermark error: {0}")]
    Watermark(String),

    /// Another invocation advanced the watermark between our read and write.
    #[error("watermark conflict: {0}")]
    WatermarkConflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn watermark(msg: impl Into<String>) -> Self {
        Self::Watermark(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::InvalidValue { .. } => 400,
            Self::MethodNotAllowed(_) => 400,
            Self::Serialization(_) => 400,
            Self::Publish(_) => 500,
            Self::Query(_) => 500,
            Self::Upload(_) => 500,
            Self::Watermark(_) => 500,
            Self::WatermarkConflict(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Whether the caller sent something we cannot accept.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}
