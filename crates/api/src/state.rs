use std::sync::Arc;

use autorender_db::repositories::TemplateRepo;
use autorender_dispatch::artifacts::FsArtifactStore;
use autorender_dispatch::rendered::RenderedStore;
use autorender_dispatch::templates::{TemplateEngine, TemplateRegistry};
use autorender_dispatch::{Dispatcher, WorkerPool};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (template store).
    pub pool: autorender_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Compiled templates, mirrored from the `templates` table.
    pub templates: Arc<TemplateRegistry>,
    /// Connected render workers.
    pub workers: Arc<WorkerPool>,
    /// HTML of in-flight jobs, served to workers by job id.
    pub rendered: Arc<RenderedStore>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wire up the dispatch engine from configuration.
    ///
    /// The artifact store is enabled only when `ARTIFACT_DIR` is set.
    pub fn new(pool: autorender_db::DbPool, config: ServerConfig) -> Self {
        let templates = Arc::new(TemplateRegistry::new());
        let workers = Arc::new(WorkerPool::new());
        let rendered = Arc::new(RenderedStore::new());

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&templates) as Arc<dyn TemplateEngine>,
            Arc::clone(&workers),
            Arc::clone(&rendered),
            config.dispatcher_config(),
        );
        if let Some(dir) = &config.artifact_dir {
            dispatcher = dispatcher.with_artifact_store(Arc::new(FsArtifactStore::new(
                dir.clone(),
                config.artifact_base_url.clone(),
            )));
        }

        Self {
            pool,
            config: Arc::new(config),
            templates,
            workers,
            rendered,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Compile every stored template into the live registry.
    ///
    /// Rows that no longer compile are logged and skipped. Returns the
    /// number of templates loaded.
    pub async fn load_templates(&self) -> Result<usize, sqlx::Error> {
        let rows = TemplateRepo::list(&self.pool).await?;
        let mut loaded = 0;
        for row in rows {
            match self.templates.insert(&row.id, &row.source).await {
                Ok(()) => loaded += 1,
                Err(e) => {
                    tracing::warn!(template_id = %row.id, error = %e, "Skipping stored template");
                }
            }
        }
        Ok(loaded)
    }
}
