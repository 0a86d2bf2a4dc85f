//! WebSocket endpoint for render workers.
//!
//! Provides the HTTP upgrade handler and the adapter that exposes an axum
//! WebSocket as a dispatch link.

mod handler;
pub mod link;

pub use handler::worker_ws_handler;
