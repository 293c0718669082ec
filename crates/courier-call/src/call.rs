//! The one-shot call lifecycle.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use courier_core::{Codec, JsonCodec, Request, Transport, TransportCall};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::callback::{Callback, CallbackExecutor, contain, dispatch};
use crate::error::{CallError, CallResult};
use crate::response::{Response, decode_response};

const UNSTARTED: u8 = 0;
const STARTED: u8 = 1;

/// A one-shot handle for a single logical request.
///
/// A call executes at most once, via [`execute`](Call::execute) or
/// [`enqueue`](Call::enqueue); a second attempt fails with
/// [`CallError::AlreadyExecuted`]. [`Clone`] yields a fresh, unstarted
/// call over the same request, which is how repeat invocations of one
/// logical request are obtained.
///
/// The executed flag is an atomic state token, so no lock is held across
/// the (possibly long) transport wait; the stored transport handle only
/// serves [`cancel`](Call::cancel).
pub struct Call<T, C: Codec = JsonCodec> {
    request: Arc<Request>,
    transport: Arc<dyn Transport>,
    codec: Arc<C>,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
    state: AtomicU8,
    raw: Mutex<Option<Arc<dyn TransportCall>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: Codec> Call<T, C> {
    pub(crate) fn new(
        request: Arc<Request>,
        transport: Arc<dyn Transport>,
        codec: Arc<C>,
        callback_executor: Option<Arc<dyn CallbackExecutor>>,
    ) -> Self {
        Self {
            request,
            transport,
            codec,
            callback_executor,
            state: AtomicU8::new(UNSTARTED),
            raw: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// The wire request this call will send.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Flip the one-shot token, or report the second use.
    fn mark_started(&self) -> CallResult<()> {
        self.state
            .compare_exchange(UNSTARTED, STARTED, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| CallError::AlreadyExecuted)
    }

    /// Create the transport operation and publish its handle for `cancel`.
    fn start(&self) -> Arc<dyn TransportCall> {
        let raw = self.transport.create_call((*self.request).clone());
        *self.raw.lock().expect("transport handle lock poisoned") = Some(raw.clone());
        raw
    }

    /// Execute synchronously, blocking the calling thread until the
    /// transport completes, then decode the response.
    ///
    /// Blocks the calling thread for the whole operation; from async
    /// contexts prefer [`enqueue`](Call::enqueue) or the stream adapter.
    pub fn execute(&self) -> CallResult<Response<T, C>>
    where
        T: DeserializeOwned,
    {
        self.mark_started()?;
        let raw = self.start();
        let raw_response = raw.execute()?;
        decode_response(raw_response, self.codec.clone())
    }

    /// Execute asynchronously; `callback` receives the outcome exactly
    /// once.
    ///
    /// Decoding happens on the thread that delivers the transport
    /// completion. A decode failure is redirected to the failure path. The
    /// callback runs on that same thread unless a callback executor is
    /// bound, in which case it is posted there fire-and-forget.
    pub fn enqueue<K>(&self, callback: K) -> CallResult<()>
    where
        T: DeserializeOwned + Send + 'static,
        K: Callback<T, C> + 'static,
    {
        self.mark_started()?;
        let raw = self.start();

        let codec = self.codec.clone();
        let executor = self.callback_executor.clone();
        let callback: Box<dyn Callback<T, C>> = Box::new(callback);

        raw.enqueue(Box::new(move |result| {
            let outcome = result
                .map_err(CallError::from)
                .and_then(|raw_response| decode_response::<T, C>(raw_response, codec));
            match outcome {
                Ok(response) => dispatch(
                    executor.as_ref(),
                    Box::new(move || contain("on_success", move || callback.on_success(response))),
                ),
                Err(error) => dispatch(
                    executor.as_ref(),
                    Box::new(move || contain("on_failure", move || callback.on_failure(error))),
                ),
            }
        }));
        Ok(())
    }

    /// Request cancellation of the in-flight transport operation.
    ///
    /// Fails with [`CallError::NotStarted`] until `execute` or `enqueue`
    /// has created one; afterwards it always forwards to the transport,
    /// which decides what cancelling a finished operation means.
    pub fn cancel(&self) -> CallResult<()> {
        let handle = self.raw.lock().expect("transport handle lock poisoned");
        match handle.as_ref() {
            Some(raw) => {
                debug!(url = %self.request.url(), "forwarding cancel to transport");
                raw.cancel();
                Ok(())
            }
            None => Err(CallError::NotStarted),
        }
    }

    /// Bind a callback executor, failing if one is already bound.
    ///
    /// Returns a fresh, unstarted call; the receiver is unaffected.
    pub fn with_callback_executor(
        &self,
        executor: Arc<dyn CallbackExecutor>,
    ) -> CallResult<Self> {
        if self.callback_executor.is_some() {
            return Err(CallError::ExecutorAlreadySet);
        }
        Ok(Self::new(
            self.request.clone(),
            self.transport.clone(),
            self.codec.clone(),
            Some(executor),
        ))
    }
}

impl<T, C: Codec> Clone for Call<T, C> {
    /// A clone is a fresh, unstarted call over the same request and
    /// executor; the original's execution state is not copied.
    fn clone(&self) -> Self {
        Self::new(
            self.request.clone(),
            self.transport.clone(),
            self.codec.clone(),
            self.callback_executor.clone(),
        )
    }
}
