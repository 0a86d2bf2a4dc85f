//! Handlers for the template store.
//!
//! Every change is written to the `templates` table first and then
//! mirrored into the live [`TemplateRegistry`](autorender_dispatch::templates::TemplateRegistry),
//! so a restart reloads exactly what the API accepted.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use autorender_core::error::CoreError;
use autorender_core::validation::validate_template_id;
use autorender_db::repositories::TemplateRepo;
use autorender_dispatch::templates::TemplateRegistry;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/templates`.
#[derive(Debug, Deserialize)]
pub struct CreateTemplate {
    pub template_id: String,
    pub template: String,
}

/// Acknowledgement for template writes.
#[derive(Debug, Serialize)]
pub struct TemplateMessage {
    pub template: String,
    pub message: &'static str,
}

/// GET /api/v1/templates
pub async fn list_templates(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let templates = TemplateRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::find_by_id(&state.pool, &template_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id: template_id,
        }))?;
    Ok(Json(DataResponse { data: template }))
}

/// POST /api/v1/templates
///
/// Add a template or replace an existing one. The source must compile
/// before anything is persisted.
pub async fn create_template(
    State(state): State<AppState>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    validate_template_id(&input.template_id)?;
    TemplateRegistry::check(&input.template)?;

    TemplateRepo::upsert(&state.pool, &input.template_id, &input.template).await?;
    state
        .templates
        .insert(&input.template_id, &input.template)
        .await?;

    tracing::info!(template_id = %input.template_id, "Template added");

    Ok(Json(TemplateMessage {
        template: input.template_id,
        message: "template added",
    }))
}

/// DELETE /api/v1/templates/{id}
pub async fn delete_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> AppResult<Response> {
    let deleted = TemplateRepo::delete(&state.pool, &template_id).await?;
    state.templates.remove(&template_id).await;

    if !deleted {
        let body = TemplateMessage {
            template: template_id,
            message: "template not found",
        };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    }

    tracing::info!(template_id = %template_id, "Template deleted");

    Ok(Json(TemplateMessage {
        template: template_id,
        message: "template deleted",
    })
    .into_response())
}
