//! Core types, window planning, and validation for the reading pipeline.

pub mod error;
pub mod limits;
pub mod reading;
pub mod schema;
pub mod watermark;
pub mod window;

pub use error::{Error, Result};
pub use reading::*;
pub use watermark::*;
pub use window::*;
