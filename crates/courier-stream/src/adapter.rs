//! The packaging modes, as typed subscription constructors.

use std::pin::Pin;
use std::task::{Context, Poll};

use courier_call::{Call, CallError, Response};
use courier_core::{Codec, DecodeError, JsonCodec, TransportError};
use futures_core::Stream;
use serde::de::DeserializeOwned;

use crate::outcome::Outcome;
use crate::subscription::Subscription;

/// Stream-adapter entry points for [`Call`].
///
/// Each constructor is one subscription: it clones the call (calls are
/// one-shot) and starts the clone. The same prototype can be subscribed
/// any number of times.
pub trait CallStreamExt<T, C: Codec = JsonCodec> {
    /// Full responses: one `Ok(Response)` item then completion, or one
    /// `Err` item.
    fn responses(&self) -> ResponseStream<T, C>;

    /// Outcome wrappers: failures become items, the stream itself never
    /// errors.
    fn results(&self) -> ResultStream<T, C>;

    /// Bare decoded bodies: a failure-status response becomes one
    /// I/O-kind error item instead of a value.
    fn bodies(&self) -> BodyStream<T, C>;
}

impl<T, C> CallStreamExt<T, C> for Call<T, C>
where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
{
    fn responses(&self) -> ResponseStream<T, C> {
        ResponseStream {
            sub: Subscription::start(self),
        }
    }

    fn results(&self) -> ResultStream<T, C> {
        ResultStream {
            sub: Subscription::start(self),
        }
    }

    fn bodies(&self) -> BodyStream<T, C> {
        BodyStream {
            sub: Subscription::start(self),
        }
    }
}

/// Response packaging. See [`CallStreamExt::responses`].
pub struct ResponseStream<T, C: Codec = JsonCodec> {
    sub: Subscription<T, C>,
}

impl<T, C: Codec> Stream for ResponseStream<T, C> {
    type Item = Result<Response<T, C>, CallError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().sub.poll_event(cx)
    }
}

/// Result packaging. See [`CallStreamExt::results`].
pub struct ResultStream<T, C: Codec = JsonCodec> {
    sub: Subscription<T, C>,
}

impl<T, C: Codec> Stream for ResultStream<T, C> {
    type Item = Outcome<T, C>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().sub.poll_event(cx) {
            Poll::Ready(Some(Ok(response))) => Poll::Ready(Some(Outcome::from_response(response))),
            Poll::Ready(Some(Err(error))) => Poll::Ready(Some(Outcome::from_error(error))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Body packaging. See [`CallStreamExt::bodies`].
pub struct BodyStream<T, C: Codec = JsonCodec> {
    sub: Subscription<T, C>,
}

impl<T, C: Codec> Stream for BodyStream<T, C> {
    type Item = Result<T, CallError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut().sub.poll_event(cx) {
            Poll::Ready(Some(Ok(response))) => Poll::Ready(Some(unwrap_body(response))),
            Poll::Ready(Some(Err(error))) => Poll::Ready(Some(Err(error))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Body packaging has no place for a failure-status response, so it turns
/// one into an I/O-kind error; a bodyless success (204/205) has no value
/// to emit either and surfaces as a decode-kind error.
fn unwrap_body<T, C: Codec>(response: Response<T, C>) -> Result<T, CallError> {
    if !response.is_success() {
        let status = response.status();
        return Err(CallError::Transport(TransportError::Io(
            std::io::Error::other(format!("http status {status}")),
        )));
    }
    match response.into_body() {
        Some(body) => Ok(body),
        None => Err(CallError::Decode(DecodeError::NoBody)),
    }
}
