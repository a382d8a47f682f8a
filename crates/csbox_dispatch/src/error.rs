use crate::ReceiverError;
use thiserror::Error;

/// Errors surfaced to callers of [`Signal`](crate::Signal).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid receiver '{receiver}': {reason}")]
    InvalidReceiver { receiver: String, reason: String },

    /// A receiver failed during a fail-fast `send`; remaining receivers were skipped.
    #[error("receiver '{receiver}' (module: {module}) failed: {error}")]
    Propagated {
        receiver: String,
        module: String,
        error: ReceiverError,
    },
}
