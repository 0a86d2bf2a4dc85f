use std::time::Duration;

use autorender_core::types::{JobId, WorkerId};

use crate::artifacts::ArtifactStoreError;
use crate::templates::TemplateError;

/// Errors surfaced to a render caller.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No template is registered under the requested id.
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    /// The template exists but failed to render with the given context.
    #[error("Template error: {0}")]
    Template(String),

    /// The pool is empty; the caller should retry later.
    #[error("No render workers available")]
    NoWorkersAvailable,

    /// The worker holding the job disconnected before replying.
    #[error("Worker {worker_id} was lost before finishing job {job_id}")]
    WorkerLost { job_id: JobId, worker_id: WorkerId },

    /// The worker did not reply within the job timeout.
    #[error("Job {job_id} timed out after {after:?}")]
    Timeout { job_id: JobId, after: Duration },

    /// A storage category was requested but no artifact store is configured.
    #[error("Artifact storage is not configured")]
    ArtifactStoreDisabled,

    /// The render succeeded but forwarding it to the artifact store failed.
    #[error("Artifact store error: {0}")]
    ArtifactStore(#[from] ArtifactStoreError),
}

impl DispatchError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::NoWorkersAvailable
                | DispatchError::WorkerLost { .. }
                | DispatchError::Timeout { .. }
        )
    }
}

impl From<TemplateError> for DispatchError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(id) => DispatchError::TemplateNotFound(id),
            other => DispatchError::Template(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(DispatchError::NoWorkersAvailable.is_retryable());
        assert!(DispatchError::WorkerLost {
            job_id: JobId::new(),
            worker_id: WorkerId::new(),
        }
        .is_retryable());
        assert!(DispatchError::Timeout {
            job_id: JobId::new(),
            after: Duration::from_secs(1),
        }
        .is_retryable());
        assert!(!DispatchError::TemplateNotFound("x".into()).is_retryable());
        assert!(!DispatchError::ArtifactStoreDisabled.is_retryable());
    }

    #[test]
    fn template_not_found_maps_to_dedicated_variant() {
        let err: DispatchError = TemplateError::NotFound("card".into()).into();
        assert!(matches!(err, DispatchError::TemplateNotFound(id) if id == "card"));
    }
}
