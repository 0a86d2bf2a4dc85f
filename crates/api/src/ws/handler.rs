use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use autorender_dispatch::WorkerSession;

use crate::state::AppState;
use crate::ws::link;

/// HTTP handler that upgrades a render worker's connection to WebSocket.
///
/// After the upgrade the connection becomes a [`WorkerSession`] that
/// joins the worker pool until the link fails.
pub async fn worker_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_worker_socket(socket, state))
}

/// Drive a single worker connection after upgrade.
async fn handle_worker_socket(socket: WebSocket, state: AppState) {
    let (session, queue) = WorkerSession::new(&state.config.session_config());
    let worker_id = session.id();
    tracing::info!(worker_id = %worker_id, "Worker WebSocket connected");

    let (sender, receiver) = link::split(socket);
    let end = session.run(sender, receiver, queue, &state.workers).await;

    tracing::info!(worker_id = %worker_id, reason = ?end, "Worker WebSocket disconnected");
}
