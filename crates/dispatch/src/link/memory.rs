//! In-process worker link.
//!
//! [`link`] returns the two server-side halves plus a [`WorkerEnd`] that
//! plays the remote worker: it reads announcements and injects replies,
//! broken frames, or a transport failure. Dropping the `WorkerEnd`
//! behaves like the worker disconnecting.

use async_trait::async_trait;
use autorender_core::protocol::{JobAnnouncement, RenderReply};
use autorender_core::types::JobId;
use tokio::sync::mpsc;

use super::{ConnectionError, LinkReceiver, LinkSender};

enum Frame {
    Reply(RenderReply),
    Malformed(String),
    Failure(ConnectionError),
}

/// Server-side outbound half of an in-process link.
pub struct MemorySender {
    tx: mpsc::UnboundedSender<JobAnnouncement>,
}

/// Server-side inbound half of an in-process link.
pub struct MemoryReceiver {
    rx: mpsc::UnboundedReceiver<Frame>,
}

/// The worker's end of an in-process link.
pub struct WorkerEnd {
    announcements: mpsc::UnboundedReceiver<JobAnnouncement>,
    frames: mpsc::UnboundedSender<Frame>,
}

/// Create a connected in-process link.
pub fn link() -> (MemorySender, MemoryReceiver, WorkerEnd) {
    let (announce_tx, announce_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    (
        MemorySender { tx: announce_tx },
        MemoryReceiver { rx: frame_rx },
        WorkerEnd {
            announcements: announce_rx,
            frames: frame_tx,
        },
    )
}

#[async_trait]
impl LinkSender for MemorySender {
    async fn send(&mut self, message: &JobAnnouncement) -> Result<(), ConnectionError> {
        self.tx
            .send(message.clone())
            .map_err(|_| ConnectionError::Closed)
    }
}

#[async_trait]
impl LinkReceiver for MemoryReceiver {
    async fn recv(&mut self) -> Result<Option<RenderReply>, ConnectionError> {
        match self.rx.recv().await {
            Some(Frame::Reply(reply)) => Ok(Some(reply)),
            Some(Frame::Malformed(text)) => Err(ConnectionError::Malformed(text)),
            Some(Frame::Failure(err)) => Err(err),
            None => Ok(None),
        }
    }
}

impl WorkerEnd {
    /// Wait for the next job announcement. `None` once the server side is gone.
    pub async fn next_announcement(&mut self) -> Option<JobAnnouncement> {
        self.announcements.recv().await
    }

    /// Take an announcement if one is already waiting.
    pub fn try_announcement(&mut self) -> Option<JobAnnouncement> {
        self.announcements.try_recv().ok()
    }

    /// Reply to a job.
    pub fn reply(&self, id: JobId, render: impl Into<String>) {
        self.reply_raw(RenderReply::new(id, render.into()));
    }

    /// Send an arbitrary reply, including ones naming unknown jobs.
    pub fn reply_raw(&self, reply: RenderReply) {
        let _ = self.frames.send(Frame::Reply(reply));
    }

    /// Send a frame the server cannot parse.
    pub fn send_malformed(&self, text: impl Into<String>) {
        let _ = self.frames.send(Frame::Malformed(text.into()));
    }

    /// Make the server's next receive fail with `error`.
    pub fn fail(&self, error: ConnectionError) {
        let _ = self.frames.send(Frame::Failure(error));
    }

    /// Stop accepting announcements while leaving replies open, so the
    /// server's next send fails.
    pub fn close_announcements(&mut self) {
        self.announcements.close();
    }
}
