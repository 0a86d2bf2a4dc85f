//! Shared domain types for the autorender workspace.
//!
//! Holds the identifiers, wire protocol messages, error type, and
//! validation helpers used by both the server and the worker. Has no
//! internal dependencies.

pub mod error;
pub mod protocol;
pub mod types;
pub mod validation;
