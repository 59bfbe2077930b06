//! Application state shared across handlers.

use pipeline_core::RelayVariant;
use redpanda::Publisher;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Queue publisher (Redpanda in production, mock in tests)
    pub publisher: Arc<dyn Publisher>,
    /// Which relay this process serves
    pub variant: RelayVariant,
}

impl AppState {
    pub fn new(publisher: Arc<dyn Publisher>, variant: RelayVariant) -> Self {
        Self { publisher, variant }
    }
}
