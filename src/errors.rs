//! Error types for the mutable-state engine.
//!
//! Precondition violations on the `add_*_event` operations are NOT errors:
//! those log an invalid-history-action record and return `None`, leaving the
//! state machine untouched. The error types here cover the cases callers must
//! treat as fatal: a missing pending entry on delete, a serialization failure
//! surfacing at session close, and internal failures while chaining a
//! continue-as-new run.

use thiserror::Error;

/// Failure of the opaque event encoding.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("failed to encode history event: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode history event: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unsupported history encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Fatal inconsistency or failure inside the mutable state.
#[derive(Debug, Error)]
pub enum StateError {
    /// A delete targeted a pending entry that does not exist. Callers treat
    /// this as corrupted mutable state.
    #[error("unable to find pending {entity} in mutable state: {key}")]
    PendingEntryNotFound { entity: &'static str, key: String },

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Continue-as-new could not construct the successor run.
    #[error("internal service error: {0}")]
    InternalService(String),
}
