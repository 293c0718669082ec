//! Completion sinks and the executor hop.
//!
//! Completion handling is a two-stage pipeline: the transport delivers its
//! completion event, the call runtime decodes it on that thread, and the
//! resulting callback invocation is either run inline or posted to a
//! [`CallbackExecutor`]. Panics escaping a user callback are contained at
//! the dispatch boundary so they never corrupt transport bookkeeping.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use courier_core::{Codec, JsonCodec};
use tracing::error;

use crate::error::CallError;
use crate::response::Response;

/// A unit of callback work.
pub type Job = Box<dyn FnOnce() + Send>;

/// Runs callback jobs away from the thread that produced the completion.
///
/// Posting is fire-and-forget; ordering beyond FIFO-per-executor is
/// implementation-defined.
pub trait CallbackExecutor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Posts callback jobs onto a tokio runtime.
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Capture the current runtime.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime context.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl CallbackExecutor for TokioExecutor {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// Consumer of one call completion.
///
/// Exactly one of the two methods fires, exactly once, after the owning
/// call was enqueued.
pub trait Callback<T, C: Codec = JsonCodec>: Send {
    fn on_success(self: Box<Self>, response: Response<T, C>);

    fn on_failure(self: Box<Self>, error: CallError);
}

/// Build a [`Callback`] from a pair of closures.
pub fn callback<T, C, S, F>(on_success: S, on_failure: F) -> impl Callback<T, C>
where
    C: Codec,
    S: FnOnce(Response<T, C>) + Send + 'static,
    F: FnOnce(CallError) + Send + 'static,
{
    struct FnCallback<S, F> {
        success: S,
        failure: F,
    }

    impl<T, C, S, F> Callback<T, C> for FnCallback<S, F>
    where
        C: Codec,
        S: FnOnce(Response<T, C>) + Send + 'static,
        F: FnOnce(CallError) + Send + 'static,
    {
        fn on_success(self: Box<Self>, response: Response<T, C>) {
            (self.success)(response);
        }

        fn on_failure(self: Box<Self>, error: CallError) {
            (self.failure)(error);
        }
    }

    FnCallback {
        success: on_success,
        failure: on_failure,
    }
}

/// Run `job` on the executor when one is bound, inline otherwise.
pub(crate) fn dispatch(executor: Option<&Arc<dyn CallbackExecutor>>, job: Job) {
    match executor {
        Some(executor) => executor.execute(job),
        None => job(),
    }
}

/// Invoke a callback body, containing any panic it raises.
pub(crate) fn contain<F: FnOnce()>(label: &'static str, f: F) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(callback = label, "user callback panicked; discarding");
    }
}
