//! HTTP relays that turn reading submissions into queue messages.

pub mod fanout;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
