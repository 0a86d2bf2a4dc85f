//! WebSocket connection to the server and the job loop.
//!
//! The worker connects to the server's worker endpoint, waits for job
//! announcements and answers each one with a render reply. Jobs are
//! handled one at a time in announcement order. A job that fails is
//! logged and left unanswered; the server's per-job timeout settles it.

use std::fmt::Display;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use autorender_core::protocol::{parse_announcement, RenderReply};

use crate::error::{FetchError, WorkerError};
use crate::job::JobRunner;
use crate::reconnect::{Backoff, ReconnectConfig};

/// Run the connect / serve / reconnect loop until `cancel` fires.
///
/// Failed connection attempts and dropped sessions are retried with
/// exponential backoff; the backoff resets after every successful
/// connection.
pub async fn run(
    ws_url: &str,
    runner: &JobRunner,
    reconnect: ReconnectConfig,
    cancel: &CancellationToken,
) {
    let mut backoff = Backoff::new(reconnect);

    loop {
        tracing::info!(url = %ws_url, "Connecting to server");

        let connected = tokio::select! {
            _ = cancel.cancelled() => break,
            result = connect_async(ws_url) => result,
        };

        match connected {
            Ok((ws_stream, _response)) => {
                tracing::info!("WebSocket connected");
                backoff.reset();

                let (mut sink, mut stream) = ws_stream.split();
                match run_session(&mut sink, &mut stream, runner, cancel).await {
                    Ok(()) => tracing::info!("WebSocket session ended"),
                    Err(e) => tracing::warn!(error = %e, "WebSocket session failed"),
                }
                if let Err(e) = sink.close().await {
                    tracing::debug!(error = %e, "Close handshake failed");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "WebSocket connection failed");
            }
        }

        if cancel.is_cancelled() || !backoff.wait(cancel).await {
            break;
        }
    }

    tracing::info!("Worker stopped");
}

/// Serve one connection until the server closes it, the stream fails,
/// or `cancel` fires.
///
/// Returns `Ok(())` on a clean close or cancellation.
pub async fn run_session<S, R>(
    sink: &mut S,
    stream: &mut R,
    runner: &JobRunner,
    cancel: &CancellationToken,
) -> Result<(), WorkerError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            msg = stream.next() => msg,
        };

        match msg {
            Some(Ok(Message::Text(text))) => {
                let announcement = match parse_announcement(&text) {
                    Ok(announcement) => announcement,
                    Err(e) => {
                        tracing::warn!(
                            error_kind = "protocol_violation",
                            error = %e,
                            raw = %text,
                            "Ignoring malformed announcement",
                        );
                        continue;
                    }
                };
                let job_id = announcement.id;
                tracing::debug!(job_id = %job_id, "Job announced");

                let outcome = tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    outcome = runner.run(job_id) => outcome,
                };

                match outcome {
                    Ok(render) => send_reply(sink, RenderReply::new(job_id, render)).await?,
                    Err(WorkerError::Fetch(FetchError::NotFound(_))) => {
                        tracing::info!(job_id = %job_id, "Job no longer held by server, dropping");
                    }
                    Err(e) => {
                        tracing::warn!(job_id = %job_id, error = %e, "Job failed, no reply sent");
                    }
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Handled automatically by tungstenite.
            }
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "Server closed WebSocket");
                return Ok(());
            }
            Some(Ok(_)) => {
                // Binary / Frame: not part of the protocol.
            }
            Some(Err(e)) => return Err(WorkerError::Receive(e)),
            None => {
                tracing::info!("WebSocket stream exhausted");
                return Ok(());
            }
        }
    }
}

async fn send_reply<S>(sink: &mut S, reply: RenderReply) -> Result<(), WorkerError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let json = serde_json::to_string(&reply).map_err(|e| WorkerError::Send(e.to_string()))?;
    tracing::debug!(job_id = %reply.id, "Sending render reply");
    sink.send(Message::Text(json))
        .await
        .map_err(|e| WorkerError::Send(e.to_string()))
}
