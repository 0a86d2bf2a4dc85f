//! Downstream artifact storage for finished renders.
//!
//! After a worker returns a screenshot, the dispatcher can forward it to
//! an [`ArtifactStore`] under a category label and hand the caller a
//! durable reference instead of the raw payload.

use std::path::PathBuf;

use async_trait::async_trait;
use autorender_core::validation::validate_category;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Errors from persisting an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactStoreError {
    /// The category label is not a safe name.
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// The payload is not valid base64.
    #[error("Payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Writing the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists a render payload and returns a durable reference to it.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn store(&self, payload: &str, category: &str) -> Result<String, ArtifactStoreError>;
}

/// Writes decoded PNG screenshots under a local directory.
///
/// Artifacts land at `<root>/<category>/<uuid>.png` and are referenced as
/// `<base_url>/<category>/<uuid>.png`. The API serves `root` statically
/// at that base URL.
pub struct FsArtifactStore {
    root: PathBuf,
    base_url: String,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn store(&self, payload: &str, category: &str) -> Result<String, ArtifactStoreError> {
        validate_category(category)
            .map_err(|e| ArtifactStoreError::InvalidCategory(e.to_string()))?;
        let bytes = STANDARD.decode(payload.trim())?;

        let dir = self.root.join(category);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.png", uuid::Uuid::new_v4());
        tokio::fs::write(dir.join(&file_name), &bytes).await?;

        tracing::debug!(category, file_name = %file_name, size = bytes.len(), "Artifact stored");
        Ok(format!("{}/{category}/{file_name}", self.base_url))
    }
}
