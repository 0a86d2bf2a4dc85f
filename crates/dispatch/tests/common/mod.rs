//! Shared helpers for dispatch integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use autorender_dispatch::link::memory::{self, WorkerEnd};
use autorender_dispatch::rendered::RenderedStore;
use autorender_dispatch::session::SessionEnd;
use autorender_dispatch::{SessionConfig, WorkerPool, WorkerSession};
use tokio::task::JoinHandle;

/// A session running against an in-process link.
pub struct ConnectedWorker {
    pub session: Arc<WorkerSession>,
    pub end: WorkerEnd,
    pub task: JoinHandle<SessionEnd>,
}

/// Session settings for tests: no keepalives.
pub fn quiet_config() -> SessionConfig {
    SessionConfig {
        heartbeat_interval: None,
        ..Default::default()
    }
}

/// Start a session on an in-process link and wait until it is in `pool`.
pub async fn connect_worker(pool: &Arc<WorkerPool>) -> ConnectedWorker {
    let (session, queue) = WorkerSession::new(&quiet_config());
    let (sender, receiver, end) = memory::link();

    let task = tokio::spawn({
        let session = Arc::clone(&session);
        let pool = Arc::clone(pool);
        async move { session.run(sender, receiver, queue, &pool).await }
    });

    let id = session.id();
    eventually(move || async move { pool.sessions().await.iter().any(|s| s.id() == id) }).await;

    ConnectedWorker { session, end, task }
}

/// Answer every announced job with `png:<html>` until the link closes.
pub fn serve_jobs(mut end: WorkerEnd, rendered: Arc<RenderedStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = end.next_announcement().await {
            let html = rendered.get(job.id).await.unwrap_or_default();
            end.reply(job.id, format!("png:{html}"));
        }
    })
}

/// Poll `check` until it holds, panicking after one second.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 1s");
}
