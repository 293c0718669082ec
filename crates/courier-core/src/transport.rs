//! The transport capability contract.
//!
//! A transport turns wire requests into single-use, cancellable operations.
//! The call runtime never reuses an operation: every execution attempt gets
//! a fresh one from [`Transport::create_call`].

use std::sync::Arc;
use std::sync::mpsc;

use crate::error::TransportError;
use crate::wire::{RawResponse, Request};

/// Completion sink for an asynchronous transport operation.
///
/// Invoked exactly once, from whatever thread or task the transport uses
/// to drive the operation.
pub type CompletionHandler = Box<dyn FnOnce(Result<RawResponse, TransportError>) + Send>;

/// A network transport.
pub trait Transport: Send + Sync {
    /// Create a fresh operation for `request`.
    fn create_call(&self, request: Request) -> Arc<dyn TransportCall>;
}

/// One single-use, cancellable transport operation.
pub trait TransportCall: Send + Sync {
    /// Start the operation and deliver its completion to `on_complete`,
    /// exactly once, without blocking the caller.
    fn enqueue(&self, on_complete: CompletionHandler);

    /// Run the operation to completion on the calling thread.
    ///
    /// The default implementation bridges [`enqueue`](TransportCall::enqueue)
    /// through a rendezvous channel, which keeps the completion path linear:
    /// completion event, channel, caller. Do not call it from a thread that
    /// also drives this transport's completions.
    fn execute(&self) -> Result<RawResponse, TransportError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.enqueue(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        match rx.recv() {
            Ok(result) => result,
            Err(_) => Err(TransportError::Protocol(
                "transport dropped its completion handler".into(),
            )),
        }
    }

    /// Request cooperative cancellation of an in-flight operation.
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodySource;
    use crate::header::HeaderMap;
    use crate::wire::ResponseHead;

    /// Transport op that completes from a worker thread, exercising the
    /// default `execute` bridge.
    struct ThreadedOp;

    impl TransportCall for ThreadedOp {
        fn enqueue(&self, on_complete: CompletionHandler) {
            std::thread::spawn(move || {
                let raw = RawResponse::new(
                    ResponseHead::new(200, HeaderMap::new()),
                    BodySource::from_bytes(&b"done"[..]),
                );
                on_complete(Ok(raw));
            });
        }

        fn cancel(&self) {}
    }

    /// Transport op that drops the handler without calling it.
    struct VanishingOp;

    impl TransportCall for VanishingOp {
        fn enqueue(&self, on_complete: CompletionHandler) {
            drop(on_complete);
        }

        fn cancel(&self) {}
    }

    #[test]
    fn default_execute_bridges_enqueue() {
        let raw = ThreadedOp.execute().unwrap();
        assert_eq!(raw.status(), 200);
        let (_, body) = raw.into_parts();
        assert_eq!(body.buffer().unwrap().as_ref(), b"done");
    }

    #[test]
    fn dropped_handler_surfaces_as_protocol_error() {
        let err = VanishingOp.execute().unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)));
    }
}
