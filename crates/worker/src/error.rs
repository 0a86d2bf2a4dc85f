use std::time::Duration;

use autorender_core::types::JobId;

/// Failure fetching a job's HTML from the server.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The server no longer holds the job (finished, timed out or never existed).
    #[error("Rendered HTML for job {0} not found")]
    NotFound(JobId),

    #[error("Unexpected status {0} fetching rendered HTML")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure producing a screenshot with the headless browser.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to launch browser: {0}")]
    Spawn(std::io::Error),

    #[error("Browser exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("Browser did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Browser produced no screenshot")]
    Missing,

    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the worker's job and connection loops.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Screenshot(#[from] ScreenshotError),

    #[error("WebSocket receive error: {0}")]
    Receive(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to send reply: {0}")]
    Send(String),
}
