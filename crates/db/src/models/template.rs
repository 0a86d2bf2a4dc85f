//! Template definition model.

use autorender_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A stored template: its id and Jinja source text.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Template {
    pub id: String,
    pub source: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
