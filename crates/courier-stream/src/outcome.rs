//! The result-packaging wrapper.

use courier_call::{CallError, Response};
use courier_core::{Codec, JsonCodec};

/// Either a completed response or the error that replaced it.
///
/// Streams in result packaging always emit values of this type; transport
/// and decode failures become [`Outcome::Error`] values instead of stream
/// errors. This is the one declared error-muting mode of the adapter.
#[derive(Debug)]
pub enum Outcome<T, C: Codec = JsonCodec> {
    /// The call completed with a response (of any status).
    Response(Response<T, C>),
    /// The call failed before a response existed.
    Error(CallError),
}

impl<T, C: Codec> Outcome<T, C> {
    pub fn from_response(response: Response<T, C>) -> Self {
        Self::Response(response)
    }

    pub fn from_error(error: CallError) -> Self {
        Self::Error(error)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn response(&self) -> Option<&Response<T, C>> {
        match self {
            Self::Response(response) => Some(response),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CallError> {
        match self {
            Self::Response(_) => None,
            Self::Error(error) => Some(error),
        }
    }

    /// Unwrap into the response, or the captured error.
    pub fn into_response(self) -> Result<Response<T, C>, CallError> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Error(error) => Err(error),
        }
    }
}
