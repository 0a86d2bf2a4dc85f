//! Integration tests for worker session delivery, reply routing and
//! teardown, driven over an in-process link.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use autorender_core::protocol::{JobAnnouncement, RenderReply};
use autorender_core::types::JobId;
use autorender_dispatch::completion::{self, JobFailure};
use autorender_dispatch::link::memory;
use autorender_dispatch::link::{ConnectionError, LinkSender};
use autorender_dispatch::session::SessionEnd;
use autorender_dispatch::{SessionConfig, WorkerPool, WorkerSession};

use common::connect_worker;

// ---------------------------------------------------------------------------
// Delivery and correlation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn announced_job_resolves_with_reply() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let job_id = JobId::new();
    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(job_id, completion).await;

    let announced = worker.end.next_announcement().await.unwrap();
    assert_eq!(announced, JobAnnouncement { id: job_id });
    assert_eq!(worker.session.pending_count().await, 1);

    worker.end.reply(job_id, "iVBORw0KGgo=");
    assert_eq!(handle.wait().await, Ok("iVBORw0KGgo=".to_string()));
    assert_eq!(worker.session.pending_count().await, 0);
}

#[tokio::test]
async fn replies_out_of_order_reach_their_own_callers() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let (first, second) = (JobId::new(), JobId::new());
    let (c1, h1) = completion::channel();
    let (c2, h2) = completion::channel();
    worker.session.enqueue_job(first, c1).await;
    worker.session.enqueue_job(second, c2).await;

    assert_eq!(worker.end.next_announcement().await.unwrap().id, first);
    assert_eq!(worker.end.next_announcement().await.unwrap().id, second);

    worker.end.reply(second, "two");
    assert_eq!(h2.wait().await, Ok("two".to_string()));
    assert_eq!(worker.session.pending_count().await, 1);

    worker.end.reply(first, "one");
    assert_eq!(h1.wait().await, Ok("one".to_string()));
}

#[tokio::test]
async fn duplicate_reply_is_dropped_and_session_survives() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let job_id = JobId::new();
    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(job_id, completion).await;
    worker.end.next_announcement().await.unwrap();

    worker.end.reply(job_id, "first");
    worker.end.reply(job_id, "second");
    assert_eq!(handle.wait().await, Ok("first".to_string()));

    // The link is still usable after the stray duplicate.
    let next = JobId::new();
    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(next, completion).await;
    assert_eq!(worker.end.next_announcement().await.unwrap().id, next);
    worker.end.reply(next, "ok");
    assert_eq!(handle.wait().await, Ok("ok".to_string()));
    assert!(!worker.task.is_finished());
}

#[tokio::test]
async fn reply_for_unknown_job_does_not_disturb_pending() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let job_id = JobId::new();
    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(job_id, completion).await;
    worker.end.next_announcement().await.unwrap();

    worker.end.reply(JobId::new(), "stray");
    worker.end.reply_raw(RenderReply {
        id: "not-a-job".into(),
        render: "stray".into(),
    });
    worker.end.reply(job_id, "mine");

    assert_eq!(handle.wait().await, Ok("mine".to_string()));
    assert_eq!(pool.len().await, 1);
}

#[tokio::test]
async fn abandoned_job_reply_is_treated_as_unknown() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let job_id = JobId::new();
    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(job_id, completion).await;
    worker.end.next_announcement().await.unwrap();

    assert!(worker.session.abandon(job_id).await);
    assert!(!worker.session.abandon(job_id).await);
    assert_eq!(handle.wait().await, Err(JobFailure::WorkerLost));

    assert!(
        !worker
            .session
            .resolve_reply(RenderReply::new(job_id, "late".into()))
            .await
    );
}

#[tokio::test]
async fn job_abandoned_before_delivery_is_never_announced() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let (completion, handle) = completion::channel();
    drop(handle);
    worker.session.enqueue_job(JobId::new(), completion).await;

    let live = JobId::new();
    let (completion, _handle) = completion::channel();
    worker.session.enqueue_job(live, completion).await;

    assert_eq!(worker.end.next_announcement().await.unwrap().id, live);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn jobs_abandoned_while_being_announced_leave_nothing_pending() {
    let pool = Arc::new(WorkerPool::new());
    let worker = connect_worker(&pool).await;

    let mut callers = Vec::new();
    for _ in 0..2_000 {
        let session = Arc::clone(&worker.session);
        callers.push(tokio::spawn(async move {
            let job_id = JobId::new();
            let (completion, handle) = completion::channel();
            session.enqueue_job(job_id, completion).await;
            tokio::task::yield_now().await;
            // Same order as a timed-out caller: stop waiting, then abandon.
            drop(handle);
            session.abandon(job_id).await;
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    let session = Arc::clone(&worker.session);
    common::eventually(move || {
        let session = Arc::clone(&session);
        async move { session.pending_count().await == 0 }
    })
    .await;
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disconnect_fails_every_pending_job() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let mut handles = Vec::new();
    for _ in 0..3 {
        let (completion, handle) = completion::channel();
        worker.session.enqueue_job(JobId::new(), completion).await;
        handles.push(handle);
    }
    for _ in 0..3 {
        worker.end.next_announcement().await.unwrap();
    }

    drop(worker.end);
    assert_eq!(worker.task.await.unwrap(), SessionEnd::Disconnected);

    for handle in handles {
        assert_eq!(handle.wait().await, Err(JobFailure::WorkerLost));
    }
    assert!(pool.is_empty().await);
    assert_eq!(worker.session.pending_count().await, 0);
}

#[tokio::test]
async fn enqueue_after_session_end_fails_with_worker_lost() {
    let pool = Arc::new(WorkerPool::new());
    let worker = connect_worker(&pool).await;

    worker.session.shutdown();
    assert_eq!(worker.task.await.unwrap(), SessionEnd::Shutdown);

    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(JobId::new(), completion).await;
    assert_eq!(handle.wait().await, Err(JobFailure::WorkerLost));
}

#[tokio::test]
async fn malformed_frame_ends_session() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;

    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(JobId::new(), completion).await;
    worker.end.next_announcement().await.unwrap();

    worker.end.send_malformed("{\"id\": 7}");

    assert_matches!(
        worker.task.await.unwrap(),
        SessionEnd::ReceiveFailed(ConnectionError::Malformed(_))
    );
    assert_eq!(handle.wait().await, Err(JobFailure::WorkerLost));
    assert!(pool.is_empty().await);
}

#[tokio::test]
async fn transport_failure_on_receive_ends_session() {
    let pool = Arc::new(WorkerPool::new());
    let worker = connect_worker(&pool).await;

    worker
        .end
        .fail(ConnectionError::Transport("connection reset".into()));

    assert_eq!(
        worker.task.await.unwrap(),
        SessionEnd::ReceiveFailed(ConnectionError::Transport("connection reset".into()))
    );
    assert!(pool.is_empty().await);
}

#[tokio::test]
async fn send_failure_ends_session_and_fails_the_job() {
    let pool = Arc::new(WorkerPool::new());
    let mut worker = connect_worker(&pool).await;
    worker.end.close_announcements();

    let (completion, handle) = completion::channel();
    worker.session.enqueue_job(JobId::new(), completion).await;

    assert_eq!(
        worker.task.await.unwrap(),
        SessionEnd::SendFailed(ConnectionError::Closed)
    );
    assert_eq!(handle.wait().await, Err(JobFailure::WorkerLost));
    assert!(pool.is_empty().await);
}

#[tokio::test]
async fn shutdown_all_stops_every_session() {
    let pool = Arc::new(WorkerPool::new());
    let a = connect_worker(&pool).await;
    let b = connect_worker(&pool).await;

    pool.shutdown_all().await;

    assert_eq!(a.task.await.unwrap(), SessionEnd::Shutdown);
    assert_eq!(b.task.await.unwrap(), SessionEnd::Shutdown);
    assert!(pool.is_empty().await);
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

struct CountingSender {
    keepalives: Arc<AtomicUsize>,
}

#[async_trait]
impl LinkSender for CountingSender {
    async fn send(&mut self, _message: &JobAnnouncement) -> Result<(), ConnectionError> {
        Ok(())
    }

    async fn keepalive(&mut self) -> Result<(), ConnectionError> {
        self.keepalives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn keepalive_fires_on_the_heartbeat_interval() {
    let pool = Arc::new(WorkerPool::new());
    let (session, queue) = WorkerSession::new(&SessionConfig {
        heartbeat_interval: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let (_, receiver, _end) = memory::link();
    let keepalives = Arc::new(AtomicUsize::new(0));
    let sender = CountingSender {
        keepalives: Arc::clone(&keepalives),
    };

    let task = tokio::spawn({
        let session = Arc::clone(&session);
        let pool = Arc::clone(&pool);
        async move { session.run(sender, receiver, queue, &pool).await }
    });

    tokio::time::sleep(Duration::from_secs(95)).await;
    assert_eq!(keepalives.load(Ordering::SeqCst), 3);

    session.shutdown();
    assert_eq!(task.await.unwrap(), SessionEnd::Shutdown);
}
