//! Handlers for render requests and the worker-facing HTML fetch.

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::Json;
use autorender_core::error::CoreError;
use autorender_core::types::JobId;
use autorender_dispatch::RenderResult;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query parameters for `POST /api/v1/render/{template_id}`.
#[derive(Debug, Deserialize)]
pub struct RenderParams {
    /// When set, the screenshot is stored under this category and the
    /// response carries its URL instead of the payload.
    pub category: Option<String>,
}

/// POST /api/v1/render/{template_id}
///
/// Render the template with the JSON body as context and wait for a
/// worker to screenshot it.
pub async fn render_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    Query(params): Query<RenderParams>,
    Json(context): Json<Map<String, Value>>,
) -> AppResult<Json<RenderResult>> {
    let result = state
        .dispatcher
        .render_template(&template_id, &context, params.category.as_deref())
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/rendered/{job_id}
///
/// Serve the HTML of an in-flight job. Unknown, finished and malformed
/// ids are all not found.
pub async fn get_rendered(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Html<String>> {
    let html = match job_id.parse::<JobId>() {
        Ok(id) => state.rendered.get(id).await,
        Err(_) => None,
    };
    html.map(Html).ok_or(AppError::Core(CoreError::NotFound {
        entity: "Rendered job",
        id: job_id,
    }))
}
