//! Repository for the `templates` table.

use sqlx::PgPool;

use crate::models::template::Template;

/// Column list for `templates` queries.
const COLUMNS: &str = "id, source, created_at, updated_at";

/// Provides CRUD operations for template definitions.
pub struct TemplateRepo;

impl TemplateRepo {
    /// List all templates ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates ORDER BY id ASC");
        sqlx::query_as::<_, Template>(&query).fetch_all(pool).await
    }

    /// Find a template by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a template, replacing the source of an existing one.
    pub async fn upsert(pool: &PgPool, id: &str, source: &str) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates (id, source) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE \
             SET source = excluded.source, updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(source)
            .fetch_one(pool)
            .await
    }

    /// Delete a template. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
