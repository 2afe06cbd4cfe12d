//! HTTP surface of the relay.
//!
//! # Endpoints
//!
//! - `POST /generate` — moderated completion

pub mod routes;

pub use routes::{app_router, AppState};
