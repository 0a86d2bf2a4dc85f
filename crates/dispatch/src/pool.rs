//! Round-robin pool of live worker sessions.
//!
//! Sessions sit in a stable slot vector. A cursor walks the slots
//! circularly, skipping empty ones. Removal empties a slot in O(1) and
//! the slot is reused by the next registration, so nothing is ever
//! shifted or rotated in place. Membership is keyed on [`WorkerId`].

use std::collections::HashMap;
use std::sync::Arc;

use autorender_core::types::WorkerId;
use tokio::sync::Mutex;

use crate::error::DispatchError;
use crate::session::WorkerSession;

#[derive(Default)]
struct Rotation {
    slots: Vec<Option<Arc<WorkerSession>>>,
    index: HashMap<WorkerId, usize>,
    free: Vec<usize>,
    cursor: usize,
}

impl Rotation {
    fn insert(&mut self, session: Arc<WorkerSession>) -> bool {
        let id = session.id();
        if self.index.contains_key(&id) {
            return false;
        }
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(session);
                slot
            }
            None => {
                self.slots.push(Some(session));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        true
    }

    fn remove(&mut self, id: WorkerId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        self.slots[slot] = None;
        if self.index.is_empty() {
            self.slots.clear();
            self.free.clear();
            self.cursor = 0;
        } else {
            self.free.push(slot);
        }
        true
    }

    fn next(&mut self) -> Option<Arc<WorkerSession>> {
        let len = self.slots.len();
        for step in 0..len {
            let slot = (self.cursor + step) % len;
            if let Some(session) = &self.slots[slot] {
                self.cursor = (slot + 1) % len;
                return Some(Arc::clone(session));
            }
        }
        None
    }

    fn members(&self) -> Vec<Arc<WorkerSession>> {
        let len = self.slots.len();
        (0..len)
            .filter_map(|step| self.slots[(self.cursor + step) % len].clone())
            .collect()
    }
}

/// The set of currently connected worker sessions.
///
/// Thread-safe via an interior `Mutex`; designed to be wrapped in `Arc`
/// and shared between the WebSocket handler and the dispatcher.
#[derive(Default)]
pub struct WorkerPool {
    rotation: Mutex<Rotation>,
}

impl WorkerPool {
    /// Create a new, empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. It is eligible for selection immediately.
    ///
    /// Registering a session that is already a member is a no-op.
    pub async fn register(&self, session: Arc<WorkerSession>) {
        let id = session.id();
        let mut rotation = self.rotation.lock().await;
        if rotation.insert(session) {
            tracing::info!(worker_id = %id, workers = rotation.index.len(), "Worker registered");
        }
    }

    /// Remove a session by identity. Unknown ids are a no-op.
    ///
    /// Returns `true` if the session was a member.
    pub async fn deregister(&self, id: WorkerId) -> bool {
        let mut rotation = self.rotation.lock().await;
        let removed = rotation.remove(id);
        if removed {
            tracing::info!(worker_id = %id, workers = rotation.index.len(), "Worker deregistered");
        }
        removed
    }

    /// Return the next session in round-robin order and advance the cursor.
    pub async fn select_next(&self) -> Result<Arc<WorkerSession>, DispatchError> {
        self.rotation
            .lock()
            .await
            .next()
            .ok_or(DispatchError::NoWorkersAvailable)
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.rotation.lock().await.index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the registered sessions, starting with the one
    /// `select_next` would return.
    pub async fn sessions(&self) -> Vec<Arc<WorkerSession>> {
        self.rotation.lock().await.members()
    }

    /// Ask every registered session to stop.
    ///
    /// Each session fails its outstanding jobs and deregisters itself as
    /// its run loop exits. Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let sessions = self.sessions().await;
        for session in &sessions {
            session.shutdown();
        }
        tracing::info!(count = sessions.len(), "Signalled all worker sessions to stop");
    }
}
