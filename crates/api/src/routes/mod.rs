pub mod health;
pub mod render;
pub mod templates;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /worker                      WebSocket (render workers)
/// /workers                     connected workers (GET)
///
/// /templates                   list, add (GET, POST)
/// /templates/{id}              get, delete
///
/// /render/{template_id}        render and screenshot (POST)
/// /rendered/{job_id}           in-flight HTML for workers (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Worker WebSocket.
        .route("/worker", get(ws::worker_ws_handler))
        .route("/workers", get(handlers::workers::list_workers))
        .nest("/templates", templates::router())
        .merge(render::router())
}
