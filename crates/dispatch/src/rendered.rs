//! Transient store of rendered HTML, keyed by job id.
//!
//! The dispatcher writes an entry before announcing a job and deletes it
//! once the job settles. Workers read it through the fetch-by-id
//! endpoint; a read after deletion simply finds nothing.

use std::collections::HashMap;

use autorender_core::types::JobId;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct RenderedStore {
    entries: RwLock<HashMap<JobId, String>>,
}

impl RenderedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job_id: JobId, html: String) {
        self.entries.write().await.insert(job_id, html);
    }

    pub async fn get(&self, job_id: JobId) -> Option<String> {
        self.entries.read().await.get(&job_id).cloned()
    }

    /// Returns `true` if an entry was removed.
    pub async fn remove(&self, job_id: JobId) -> bool {
        self.entries.write().await.remove(&job_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
