use axum::extract::State;
use axum::Json;
use autorender_core::types::{Timestamp, WorkerId};
use serde::Serialize;

use crate::response::DataResponse;
use crate::state::AppState;

/// One connected render worker.
#[derive(Debug, Serialize)]
pub struct WorkerInfo {
    pub worker_id: WorkerId,
    pub connected_at: Timestamp,
    /// Jobs announced to the worker and not yet answered.
    pub pending_jobs: usize,
}

/// GET /api/v1/workers
///
/// Connected workers, starting with the one that receives the next job.
pub async fn list_workers(State(state): State<AppState>) -> Json<DataResponse<Vec<WorkerInfo>>> {
    let mut workers = Vec::new();
    for session in state.workers.sessions().await {
        workers.push(WorkerInfo {
            worker_id: session.id(),
            connected_at: session.connected_at(),
            pending_jobs: session.pending_count().await,
        });
    }
    Json(DataResponse { data: workers })
}
