//! Worker link over an axum WebSocket.
//!
//! Announcements go out as JSON text frames and keepalives as ping
//! frames. Inbound text frames must parse as a reply; anything else that
//! is not a control frame is a malformed frame and ends the session.

use async_trait::async_trait;
use autorender_core::protocol::{parse_reply, JobAnnouncement, RenderReply};
use autorender_dispatch::link::{ConnectionError, LinkReceiver, LinkSender};
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};

/// Outbound half of a worker WebSocket.
pub struct WsLinkSender {
    sink: SplitSink<WebSocket, Message>,
}

/// Inbound half of a worker WebSocket.
pub struct WsLinkReceiver {
    stream: SplitStream<WebSocket>,
}

/// Split an upgraded socket into link halves.
pub fn split(socket: WebSocket) -> (WsLinkSender, WsLinkReceiver) {
    let (sink, stream) = socket.split();
    (WsLinkSender { sink }, WsLinkReceiver { stream })
}

fn transport(err: axum::Error) -> ConnectionError {
    ConnectionError::Transport(err.to_string())
}

#[async_trait]
impl LinkSender for WsLinkSender {
    async fn send(&mut self, message: &JobAnnouncement) -> Result<(), ConnectionError> {
        let text = serde_json::to_string(message)
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(transport)
    }

    async fn keepalive(&mut self) -> Result<(), ConnectionError> {
        self.sink
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(transport)
    }
}

#[async_trait]
impl LinkReceiver for WsLinkReceiver {
    async fn recv(&mut self) -> Result<Option<RenderReply>, ConnectionError> {
        while let Some(frame) = self.stream.next().await {
            match frame.map_err(transport)? {
                Message::Text(text) => {
                    return parse_reply(text.as_str()).map(Some).map_err(|e| {
                        tracing::warn!(
                            error = %e,
                            error_kind = "protocol_violation",
                            "Malformed reply frame",
                        );
                        ConnectionError::Malformed(e.to_string())
                    });
                }
                Message::Binary(_) => {
                    tracing::warn!(error_kind = "protocol_violation", "Unexpected binary frame");
                    return Err(ConnectionError::Malformed("binary frame".into()));
                }
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) => {
                    tracing::trace!("Control frame received");
                }
            }
        }
        Ok(None)
    }
}
