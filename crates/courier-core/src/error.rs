//! Error types for the courier wire layer.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a transport while executing a wire request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("call cancelled")]
    Cancelled,

    #[error("response body exceeds limit of {limit} bytes")]
    BodyTooLarge { limit: u64 },

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Errors raised by a codec converting response bytes into a typed value.
///
/// A `DecodeError` always means the bytes were readable but not decodable.
/// I/O failures of the underlying source are attributed separately, via
/// [`IoCaptureReader`](crate::body::IoCaptureReader).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed body: {0}")]
    Malformed(String),

    #[error("no body to decode")]
    NoBody,
}

/// Errors raised while resolving a request template into a wire request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("unresolved path parameter {{{0}}}")]
    UnresolvedPathParam(String),

    #[error("no path parameter {{{0}}} in template")]
    UnknownPathParam(String),

    #[error("body encoding failed: {0}")]
    Encode(String),
}
