//! Worker link wire protocol.
//!
//! The server and a worker exchange exactly two JSON message shapes over
//! WebSocket text frames:
//!
//! - server -> worker: `{"id": "<job-id>"}` announces a job.
//! - worker -> server: `{"id": "<job-id>", "render": "<payload>"}` answers it.
//!
//! There is no handshake, heartbeat or acknowledgment message.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Announcement of a job the worker should render.
///
/// Carries only the job identifier; the worker fetches the HTML through
/// the rendered-by-id endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAnnouncement {
    pub id: JobId,
}

/// A worker's answer to a previously announced job.
///
/// `id` is kept as the raw string so that a reply naming something that
/// is not a job identifier is handled like any other unknown job rather
/// than as a broken frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderReply {
    pub id: String,
    pub render: String,
}

impl RenderReply {
    pub fn new(id: JobId, render: String) -> Self {
        Self {
            id: id.to_string(),
            render,
        }
    }

    /// The job this reply answers, if `id` is a well-formed identifier.
    pub fn job_id(&self) -> Option<JobId> {
        self.id.parse().ok()
    }
}

/// Parse a worker text frame into a [`RenderReply`].
pub fn parse_reply(text: &str) -> Result<RenderReply, serde_json::Error> {
    serde_json::from_str(text)
}

/// Parse a server text frame into a [`JobAnnouncement`].
pub fn parse_announcement(text: &str) -> Result<JobAnnouncement, serde_json::Error> {
    serde_json::from_str(text)
}
