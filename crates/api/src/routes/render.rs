use axum::routing::{get, post};
use axum::Router;

use crate::handlers::render;
use crate::state::AppState;

/// Render routes.
///
/// ```text
/// POST /render/{template_id}   -> render_template
/// GET  /rendered/{job_id}      -> get_rendered
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/render/{template_id}", post(render::render_template))
        .route("/rendered/{job_id}", get(render::get_rendered))
}
