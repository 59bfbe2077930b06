//! Size limits for relay requests.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so `MAX_READINGS_PER_REQUEST` is duplicated on `ReadingBatchRequest`.
//! Keep both in sync when modifying.

/// Maximum request body size in bytes (1MB).
pub const MAX_BODY_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum readings per request.
pub const MAX_READINGS_PER_REQUEST: usize = 10_000;
