//! Call-level error taxonomy.

use courier_core::{DecodeError, TransportError};
use thiserror::Error;

/// Errors surfaced by the call lifecycle.
#[derive(Debug, Error)]
pub enum CallError {
    /// The one-shot guard tripped: this call was already executed.
    #[error("call already executed")]
    AlreadyExecuted,

    /// `cancel()` before any transport operation was created.
    #[error("cancel requires execute or enqueue first")]
    NotStarted,

    /// `with_callback_executor` on a call that already has one bound.
    #[error("callback executor already set")]
    ExecutorAlreadySet,

    /// The transport failed to produce a response.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// A success-status body failed to decode.
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
}

impl CallError {
    /// `true` for protocol-misuse errors, which are surfaced synchronously
    /// at the point of misuse and never routed through failure callbacks.
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExecuted | Self::NotStarted | Self::ExecutorAlreadySet
        )
    }
}

/// Result type alias for call operations.
pub type CallResult<T> = Result<T, CallError>;
