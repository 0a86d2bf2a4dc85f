//! Per-worker session: outbound job delivery and inbound reply routing.
//!
//! A [`WorkerSession`] is created when a worker's link is accepted and
//! lives until that link fails. [`WorkerSession::run`] registers the
//! session with the [`WorkerPool`], then drives two loops concurrently:
//!
//! - **outbound**: takes the next queued job, records its completion in
//!   the pending table, and announces `{id}` to the worker;
//! - **inbound**: reads `{id, render}` replies and resolves the matching
//!   pending completion.
//!
//! Whichever loop ends first ends the session. Cleanup then runs exactly
//! once: the session leaves the pool and every queued or pending job is
//! failed with [`JobFailure::WorkerLost`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use autorender_core::protocol::{JobAnnouncement, RenderReply};
use autorender_core::types::{JobId, Timestamp, WorkerId};
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::completion::{Completion, JobFailure};
use crate::link::{ConnectionError, LinkReceiver, LinkSender};
use crate::pool::WorkerPool;

/// Default per-worker outbound queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Default interval between transport keepalives.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Tunables for a worker session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Jobs that may wait for delivery before `enqueue_job` suspends.
    pub queue_capacity: usize,
    /// Keepalive interval. `None` disables keepalives.
    pub heartbeat_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat_interval: Some(DEFAULT_HEARTBEAT_INTERVAL),
        }
    }
}

/// A job waiting in a session's outbound queue.
struct QueuedJob {
    job_id: JobId,
    completion: Completion,
}

/// Receiving end of a session's outbound queue.
///
/// Returned by [`WorkerSession::new`] and consumed by [`WorkerSession::run`].
pub struct JobQueue {
    rx: mpsc::Receiver<QueuedJob>,
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The worker closed its link cleanly.
    Disconnected,
    /// Announcing a job (or a keepalive) failed.
    SendFailed(ConnectionError),
    /// Reading from the link failed or produced a malformed frame.
    ReceiveFailed(ConnectionError),
    /// The session was shut down from the server side.
    Shutdown,
}

/// Server-side state for one connected worker.
pub struct WorkerSession {
    id: WorkerId,
    connected_at: Timestamp,
    heartbeat_interval: Option<Duration>,
    outbound: mpsc::Sender<QueuedJob>,
    /// Jobs announced to this worker and not yet answered.
    pending: Mutex<HashMap<JobId, Completion>>,
    cancel: CancellationToken,
}

impl fmt::Debug for WorkerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSession")
            .field("id", &self.id)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

impl WorkerSession {
    /// Create a session with a fresh identity.
    ///
    /// The session does nothing until [`run`](Self::run) is called with
    /// the returned queue.
    pub fn new(config: &SessionConfig) -> (Arc<Self>, JobQueue) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let session = Arc::new(Self {
            id: WorkerId::new(),
            connected_at: chrono::Utc::now(),
            heartbeat_interval: config.heartbeat_interval.filter(|d| !d.is_zero()),
            outbound: tx,
            pending: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        });
        (session, JobQueue { rx })
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    /// Number of jobs announced to this worker and still awaiting a reply.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Queue a job for delivery to this worker.
    ///
    /// Suspends only while the outbound queue is full. If the session has
    /// already ended, the completion is failed with `WorkerLost` instead.
    pub async fn enqueue_job(&self, job_id: JobId, completion: Completion) {
        let job = QueuedJob { job_id, completion };
        if let Err(mpsc::error::SendError(job)) = self.outbound.send(job).await {
            tracing::debug!(
                worker_id = %self.id,
                job_id = %job.job_id,
                "Session already closed, failing job",
            );
            job.completion.resolve(Err(JobFailure::WorkerLost));
        }
    }

    /// Forget a job whose caller has stopped waiting.
    ///
    /// A reply arriving later is treated as naming an unknown job.
    /// Returns `true` if the job was pending on this session.
    pub async fn abandon(&self, job_id: JobId) -> bool {
        self.pending.lock().await.remove(&job_id).is_some()
    }

    /// Route one reply to its pending completion.
    ///
    /// Returns `true` if a completion was resolved. Replies naming an
    /// unknown or already answered job are logged and dropped.
    pub async fn resolve_reply(&self, reply: RenderReply) -> bool {
        let completion = match reply.job_id() {
            Some(job_id) => self.pending.lock().await.remove(&job_id),
            None => None,
        };

        match completion {
            Some(completion) => {
                tracing::debug!(worker_id = %self.id, job_id = %reply.id, "Reply received");
                if !completion.resolve(Ok(reply.render)) {
                    tracing::debug!(
                        worker_id = %self.id,
                        job_id = %reply.id,
                        "Caller no longer waiting, reply discarded",
                    );
                }
                true
            }
            None => {
                tracing::warn!(
                    worker_id = %self.id,
                    job_id = %reply.id,
                    error_kind = "protocol_violation",
                    "Reply for unknown job dropped",
                );
                false
            }
        }
    }

    /// Ask a running session to stop. Outstanding jobs fail with `WorkerLost`.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Register with `pool` and drive the link until it fails.
    ///
    /// On return the session has left the pool and every job it held has
    /// been failed.
    pub async fn run<S, R>(
        self: Arc<Self>,
        mut sender: S,
        mut receiver: R,
        mut queue: JobQueue,
        pool: &WorkerPool,
    ) -> SessionEnd
    where
        S: LinkSender,
        R: LinkReceiver,
    {
        pool.register(Arc::clone(&self)).await;
        tracing::info!(worker_id = %self.id, "Worker session started");

        let end = tokio::select! {
            result = self.outbound_loop(&mut sender, &mut queue) => match result {
                Ok(()) => SessionEnd::Shutdown,
                Err(e) => SessionEnd::SendFailed(e),
            },
            result = self.inbound_loop(&mut receiver) => match result {
                Ok(()) => SessionEnd::Disconnected,
                Err(e) => SessionEnd::ReceiveFailed(e),
            },
            () = self.cancel.cancelled() => SessionEnd::Shutdown,
        };

        pool.deregister(self.id).await;
        let failed = self.fail_outstanding(&mut queue).await;

        tracing::info!(
            worker_id = %self.id,
            reason = ?end,
            failed_jobs = failed,
            "Worker session ended",
        );
        end
    }

    async fn outbound_loop<S: LinkSender>(
        &self,
        sender: &mut S,
        queue: &mut JobQueue,
    ) -> Result<(), ConnectionError> {
        let mut heartbeat = self.heartbeat_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                job = queue.rx.recv() => {
                    let Some(QueuedJob { job_id, completion }) = job else {
                        return Ok(());
                    };
                    {
                        // Under the lock: `abandon` either finds the entry or the job is skipped.
                        let mut pending = self.pending.lock().await;
                        if completion.is_abandoned() {
                            tracing::debug!(worker_id = %self.id, job_id = %job_id, "Skipping abandoned job");
                            continue;
                        }
                        pending.insert(job_id, completion);
                    }
                    sender.send(&JobAnnouncement { id: job_id }).await?;
                    tracing::debug!(worker_id = %self.id, job_id = %job_id, "Job announced");
                }
                () = tick(&mut heartbeat) => {
                    sender.keepalive().await?;
                    tracing::trace!(worker_id = %self.id, "Keepalive sent");
                }
            }
        }
    }

    async fn inbound_loop<R: LinkReceiver>(&self, receiver: &mut R) -> Result<(), ConnectionError> {
        while let Some(reply) = receiver.recv().await? {
            self.resolve_reply(reply).await;
        }
        Ok(())
    }

    /// Fail every queued and pending job with `WorkerLost`.
    async fn fail_outstanding(&self, queue: &mut JobQueue) -> usize {
        queue.rx.close();
        let mut failed = 0;

        while let Ok(job) = queue.rx.try_recv() {
            if job.completion.resolve(Err(JobFailure::WorkerLost)) {
                failed += 1;
            }
        }

        let pending = std::mem::take(&mut *self.pending.lock().await);
        for (_, completion) in pending {
            if completion.resolve(Err(JobFailure::WorkerLost)) {
                failed += 1;
            }
        }

        failed
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
