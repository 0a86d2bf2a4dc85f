//! Template expansion.
//!
//! The dispatcher only needs `template id + context -> HTML`, expressed by
//! [`TemplateEngine`]. [`TemplateRegistry`] implements it with a
//! `minijinja` environment holding every registered template, compiled
//! once on insert.

use async_trait::async_trait;
use minijinja::{Environment, ErrorKind};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Errors from compiling or rendering a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template '{0}' not found")]
    NotFound(String),

    #[error("Template syntax error: {0}")]
    Syntax(String),

    #[error("Render failed: {0}")]
    Render(String),
}

/// Expands a registered template with a context into HTML.
#[async_trait]
pub trait TemplateEngine: Send + Sync {
    async fn render(
        &self,
        template_id: &str,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError>;
}

/// In-memory set of compiled templates.
///
/// Loaded from the template store at startup and kept in sync by the
/// template endpoints.
pub struct TemplateRegistry {
    env: RwLock<Environment<'static>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            env: RwLock::new(Environment::new()),
        }
    }

    /// Check that `source` compiles, without registering it.
    pub fn check(source: &str) -> Result<(), TemplateError> {
        Environment::new()
            .template_from_str(source)
            .map(|_| ())
            .map_err(|e| TemplateError::Syntax(e.to_string()))
    }

    /// Compile and register a template, replacing any previous version.
    pub async fn insert(&self, id: &str, source: &str) -> Result<(), TemplateError> {
        self.env
            .write()
            .await
            .add_template_owned(id.to_string(), source.to_string())
            .map_err(|e| TemplateError::Syntax(e.to_string()))
    }

    /// Unregister a template. Returns `true` if it was registered.
    pub async fn remove(&self, id: &str) -> bool {
        let mut env = self.env.write().await;
        if env.get_template(id).is_err() {
            return false;
        }
        env.remove_template(id);
        true
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.env.read().await.get_template(id).is_ok()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateEngine for TemplateRegistry {
    async fn render(
        &self,
        template_id: &str,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        let env = self.env.read().await;
        let template = env.get_template(template_id).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => TemplateError::NotFound(template_id.to_string()),
            _ => TemplateError::Render(e.to_string()),
        })?;
        template
            .render(context)
            .map_err(|e| TemplateError::Render(e.to_string()))
    }
}
