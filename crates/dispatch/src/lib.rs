//! Job dispatch and correlation engine.
//!
//! Tracks connected render workers, picks one per job in round-robin
//! order, announces the job over the worker's link, and routes the
//! worker's out-of-order reply back to the caller awaiting it.
//!
//! The pieces, leaf to root:
//!
//! - [`link`]: the two halves of a worker's bidirectional link.
//! - [`completion`]: single-assignment handles correlating a reply to a caller.
//! - [`session`]: per-worker outbound/inbound loops and pending-job table.
//! - [`pool`]: live sessions with a rotation cursor.
//! - [`dispatcher`]: renders a template, hands the job to a worker, awaits the result.
//!
//! [`templates`], [`rendered`] and [`artifacts`] are the collaborators the
//! dispatcher drives around the core.

pub mod artifacts;
pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod link;
pub mod pool;
pub mod rendered;
pub mod session;
pub mod templates;

pub use dispatcher::{Dispatcher, DispatcherConfig, RenderOutput, RenderResult};
pub use error::DispatchError;
pub use pool::WorkerPool;
pub use session::{SessionConfig, WorkerSession};
