//! Single-assignment completion handles.
//!
//! Each job gets one [`Completion`] (the producer side, parked in a worker
//! session) and one [`CompletionHandle`] (the consumer side, awaited by
//! the dispatcher). Resolving consumes the `Completion`, so a job can be
//! resolved at most once; a `Completion` dropped without being resolved
//! reads as [`JobFailure::WorkerLost`] on the waiting side.

use tokio::sync::oneshot;

/// Why a job produced no result.
///
/// A job timeout is not a failure of the completion: the waiting side
/// gives up and drops its handle, and the dispatcher reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JobFailure {
    /// The worker's link failed while the job was outstanding.
    #[error("worker disconnected before replying")]
    WorkerLost,
}

/// The outcome delivered to a waiting caller: the worker's render payload
/// or the reason there is none.
pub type JobOutcome = Result<String, JobFailure>;

/// Producer side of a job's completion.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<JobOutcome>,
}

/// Consumer side of a job's completion.
#[derive(Debug)]
pub struct CompletionHandle {
    rx: oneshot::Receiver<JobOutcome>,
}

/// Create a fresh, unresolved completion pair.
pub fn channel() -> (Completion, CompletionHandle) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, CompletionHandle { rx })
}

impl Completion {
    /// Deliver the outcome. Returns `false` if nobody is waiting any more.
    pub fn resolve(self, outcome: JobOutcome) -> bool {
        self.tx.send(outcome).is_ok()
    }

    /// Whether the waiting side has given up (timed out or was dropped).
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CompletionHandle {
    /// Wait for the job's outcome.
    pub async fn wait(self) -> JobOutcome {
        self.rx.await.unwrap_or(Err(JobFailure::WorkerLost))
    }
}
