//! Render worker: connects to the server's worker endpoint, screenshots
//! each announced job and replies with the base64 PNG.

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod job;
pub mod reconnect;
pub mod screenshot;
