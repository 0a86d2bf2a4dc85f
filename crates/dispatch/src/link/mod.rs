//! Worker link abstraction.
//!
//! A worker's persistent bidirectional connection is split into an
//! outbound half ([`LinkSender`]) and an inbound half ([`LinkReceiver`])
//! so the session can drive both directions from concurrent loops. The
//! API crate implements these over an axum WebSocket; [`memory`] provides
//! an in-process pair for tests and tooling.

use async_trait::async_trait;
use autorender_core::protocol::{JobAnnouncement, RenderReply};

pub mod memory;

/// Errors raised by either half of a worker link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// The peer has gone away.
    #[error("Worker link closed")]
    Closed,

    /// The peer sent a frame that is not a valid protocol message.
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// The underlying transport failed.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Outbound half of a worker link.
#[async_trait]
pub trait LinkSender: Send + 'static {
    /// Send one job announcement to the worker.
    async fn send(&mut self, message: &JobAnnouncement) -> Result<(), ConnectionError>;

    /// Transport-level keepalive (e.g. a WebSocket ping).
    ///
    /// Not a protocol message. The default implementation does nothing.
    async fn keepalive(&mut self) -> Result<(), ConnectionError> {
        Ok(())
    }
}

/// Inbound half of a worker link.
#[async_trait]
pub trait LinkReceiver: Send + 'static {
    /// Wait for the next reply.
    ///
    /// Returns `Ok(None)` when the peer closed the link cleanly and an
    /// error when it dropped or sent a malformed frame.
    async fn recv(&mut self) -> Result<Option<RenderReply>, ConnectionError>;
}
