//! Side-channel fetch of a job's rendered HTML.

use async_trait::async_trait;
use autorender_core::types::JobId;
use reqwest::StatusCode;

use crate::error::FetchError;

/// Where the worker obtains the HTML for an announced job.
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch(&self, job_id: JobId) -> Result<String, FetchError>;
}

/// Fetches HTML from the server's `GET {base}/rendered/{job_id}` endpoint.
#[derive(Debug, Clone)]
pub struct RenderedClient {
    http: reqwest::Client,
    base_url: String,
}

impl RenderedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn rendered_url(&self, job_id: JobId) -> String {
        format!("{}/rendered/{job_id}", self.base_url)
    }
}

#[async_trait]
impl HtmlSource for RenderedClient {
    async fn fetch(&self, job_id: JobId) -> Result<String, FetchError> {
        let response = self.http.get(self.rendered_url(job_id)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(job_id)),
            status if !status.is_success() => Err(FetchError::Status(status.as_u16())),
            _ => Ok(response.text().await?),
        }
    }
}
