//! The per-subscription driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use courier_call::{Call, CallError, Callback, Response};
use courier_core::Codec;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::debug;

/// One live subscription over a cloned call.
///
/// The forwarding callback pushes exactly one completion event into the
/// channel, then the sender drops, which closes the channel; that closure
/// is the completion signal. Dropping the subscription raises the
/// suppression flag (checked immediately before emission) and cancels the
/// cloned call.
pub(crate) struct Subscription<T, C: Codec> {
    call: Arc<Call<T, C>>,
    cancelled: Arc<AtomicBool>,
    rx: mpsc::UnboundedReceiver<Result<Response<T, C>, CallError>>,
    finished: bool,
}

impl<T, C> Subscription<T, C>
where
    T: DeserializeOwned + Send + 'static,
    C: Codec,
{
    /// Clone `prototype` and start the clone immediately (subscriptions
    /// are the unit of execution; the prototype itself is never started).
    pub(crate) fn start(prototype: &Call<T, C>) -> Self {
        let call = Arc::new(prototype.clone());
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::unbounded_channel();

        let forward = Forward {
            tx,
            cancelled: cancelled.clone(),
        };
        if let Err(error) = call.enqueue(forward) {
            // The clone is fresh by construction; its one-shot guard
            // cannot have tripped.
            unreachable!("fresh call clone refused enqueue: {error}");
        }

        Self {
            call,
            cancelled,
            rx,
            finished: false,
        }
    }
}

impl<T, C: Codec> Subscription<T, C> {
    /// Poll the single completion event; `None` is stream completion.
    pub(crate) fn poll_event(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Response<T, C>, CallError>>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(event)),
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, C: Codec> Drop for Subscription<T, C> {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if !self.finished {
            debug!("subscription dropped mid-flight; cancelling its call");
            // NotStarted is impossible: the call was enqueued at
            // subscription start.
            let _ = self.call.cancel();
        }
    }
}

/// Internal callback bridging one call completion into the channel.
struct Forward<T, C: Codec> {
    tx: mpsc::UnboundedSender<Result<Response<T, C>, CallError>>,
    cancelled: Arc<AtomicBool>,
}

impl<T, C> Callback<T, C> for Forward<T, C>
where
    T: Send,
    C: Codec,
{
    fn on_success(self: Box<Self>, response: Response<T, C>) {
        if self.cancelled.load(Ordering::SeqCst) {
            debug!("completion after unsubscribe; suppressed");
            return;
        }
        let _ = self.tx.send(Ok(response));
    }

    fn on_failure(self: Box<Self>, error: CallError) {
        if self.cancelled.load(Ordering::SeqCst) {
            debug!("failure after unsubscribe; suppressed");
            return;
        }
        let _ = self.tx.send(Err(error));
    }
}
