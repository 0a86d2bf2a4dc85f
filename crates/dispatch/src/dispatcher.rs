//! Render request orchestration.
//!
//! [`Dispatcher::render_template`] expands the template, parks the HTML in
//! the [`RenderedStore`] under a fresh job id, hands the job to the next
//! worker in the pool and waits for that worker's reply. The stored HTML
//! is removed however the job ends, including when the caller goes away
//! mid-wait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use autorender_core::types::JobId;
use autorender_core::validation::validate_category;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::artifacts::{ArtifactStore, ArtifactStoreError};
use crate::completion::{self, JobFailure};
use crate::error::DispatchError;
use crate::pool::WorkerPool;
use crate::rendered::RenderedStore;
use crate::session::WorkerSession;
use crate::templates::TemplateEngine;

/// Default time a caller waits for a worker's reply.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// How long to wait for a worker reply. `None` waits indefinitely.
    pub job_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            job_timeout: Some(DEFAULT_JOB_TIMEOUT),
        }
    }
}

/// What a successful render hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderOutput {
    /// The worker's payload, as returned (base64 PNG).
    Render(String),
    /// Reference returned by the artifact store.
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderResult {
    pub job_id: JobId,
    pub template: String,
    #[serde(flatten)]
    pub output: RenderOutput,
}

/// Drives render jobs from request to reply.
pub struct Dispatcher {
    templates: Arc<dyn TemplateEngine>,
    pool: Arc<WorkerPool>,
    rendered: Arc<RenderedStore>,
    artifacts: Option<Arc<dyn ArtifactStore>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        templates: Arc<dyn TemplateEngine>,
        pool: Arc<WorkerPool>,
        rendered: Arc<RenderedStore>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            templates,
            pool,
            rendered,
            artifacts: None,
            config,
        }
    }

    /// Enable forwarding of finished renders to `store`.
    pub fn with_artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(store);
        self
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn rendered(&self) -> &Arc<RenderedStore> {
        &self.rendered
    }

    /// Render `template_id` with `context` on the next available worker.
    ///
    /// With a `category`, the worker's payload is forwarded to the
    /// artifact store and the caller receives its reference instead.
    pub async fn render_template(
        &self,
        template_id: &str,
        context: &Map<String, Value>,
        category: Option<&str>,
    ) -> Result<RenderResult, DispatchError> {
        if let Some(category) = category {
            if self.artifacts.is_none() {
                return Err(DispatchError::ArtifactStoreDisabled);
            }
            validate_category(category)
                .map_err(|e| ArtifactStoreError::InvalidCategory(e.to_string()))?;
        }

        let html = self.templates.render(template_id, context).await?;

        let job_id = JobId::new();
        self.rendered.insert(job_id, html).await;
        let mut guard = JobGuard::new(job_id, Arc::clone(&self.rendered));

        let started = Instant::now();
        let outcome = self.dispatch(job_id, template_id, &mut guard).await;

        self.rendered.remove(job_id).await;
        guard.disarm();

        let render = match outcome {
            Ok(render) => render,
            Err(e) => {
                tracing::warn!(job_id = %job_id, template_id, error = %e, "Render job failed");
                return Err(e);
            }
        };
        tracing::info!(
            job_id = %job_id,
            template_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Render job completed",
        );

        let output = match (category, &self.artifacts) {
            (Some(category), Some(store)) => RenderOutput::Url(store.store(&render, category).await?),
            _ => RenderOutput::Render(render),
        };

        Ok(RenderResult {
            job_id,
            template: template_id.to_string(),
            output,
        })
    }

    /// Hand one job to the next worker and wait for its outcome.
    async fn dispatch(
        &self,
        job_id: JobId,
        template_id: &str,
        guard: &mut JobGuard,
    ) -> Result<String, DispatchError> {
        let (completion, handle) = completion::channel();
        let session = self.pool.select_next().await?;
        guard.session = Some(Arc::clone(&session));

        tracing::info!(
            job_id = %job_id,
            template_id,
            worker_id = %session.id(),
            "Dispatching render job",
        );

        let delivered = async {
            session.enqueue_job(job_id, completion).await;
            handle.wait().await
        };

        let outcome = match self.config.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, delivered).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    session.abandon(job_id).await;
                    return Err(DispatchError::Timeout { job_id, after: limit });
                }
            },
            None => delivered.await,
        };

        outcome.map_err(|JobFailure::WorkerLost| DispatchError::WorkerLost {
            job_id,
            worker_id: session.id(),
        })
    }
}

/// Cleans up after a job whose caller stopped waiting before it settled.
///
/// Dropping the render future skips the explicit cleanup in
/// `render_template`; the guard then removes the stored HTML and the
/// pending entry from a spawned task.
struct JobGuard {
    job_id: JobId,
    rendered: Arc<RenderedStore>,
    session: Option<Arc<WorkerSession>>,
    armed: bool,
}

impl JobGuard {
    fn new(job_id: JobId, rendered: Arc<RenderedStore>) -> Self {
        Self {
            job_id,
            rendered,
            session: None,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let job_id = self.job_id;
        let rendered = Arc::clone(&self.rendered);
        let session = self.session.take();
        tracing::debug!(job_id = %job_id, "Caller went away, cleaning up job");
        runtime.spawn(async move {
            rendered.remove(job_id).await;
            if let Some(session) = session {
                session.abandon(job_id).await;
            }
        });
    }
}
