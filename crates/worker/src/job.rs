//! Processing of a single announced job.

use std::sync::Arc;
use std::time::Instant;

use autorender_core::types::JobId;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{ScreenshotError, WorkerError};
use crate::fetch::HtmlSource;
use crate::screenshot::Screenshotter;

/// Fetches a job's HTML and screenshots it, retrying the browser.
#[derive(Clone)]
pub struct JobRunner {
    source: Arc<dyn HtmlSource>,
    screenshotter: Arc<dyn Screenshotter>,
    attempts: u32,
}

impl JobRunner {
    /// `attempts` is clamped to at least one browser run.
    pub fn new(
        source: Arc<dyn HtmlSource>,
        screenshotter: Arc<dyn Screenshotter>,
        attempts: u32,
    ) -> Self {
        Self {
            source,
            screenshotter,
            attempts: attempts.max(1),
        }
    }

    /// Produce the base64 PNG payload for `job_id`.
    pub async fn run(&self, job_id: JobId) -> Result<String, WorkerError> {
        let start = Instant::now();
        let html = self.source.fetch(job_id).await?;
        let png = self.capture_with_retries(job_id, &html).await?;

        tracing::info!(
            job_id = %job_id,
            bytes = png.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Render complete",
        );
        Ok(BASE64.encode(png))
    }

    async fn capture_with_retries(&self, job_id: JobId, html: &str) -> Result<Vec<u8>, ScreenshotError> {
        let mut attempt = 1;
        loop {
            match self.screenshotter.capture(html).await {
                Ok(png) => return Ok(png),
                Err(e) if attempt < self.attempts => {
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        error = %e,
                        "Screenshot failed, retrying",
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
