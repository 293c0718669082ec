//! In-memory transport with scripted replies and manual completion.
//!
//! A test double for the transport capability. Replies are served from a
//! scripted queue: `Respond` and `Fail` complete inline on the enqueuing
//! thread, while `Hold` parks the operation until a [`MemController`]
//! delivers a completion, which makes in-flight states and cancellation
//! observable. Cancelling a held operation delivers
//! [`TransportError::Cancelled`] to its handler, exactly once.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use courier_core::{
    BodySource, CompletionHandler, HeaderMap, RawResponse, Request, ResponseHead, Transport,
    TransportCall, TransportError,
};
use tracing::debug;

/// The body a scripted reply serves.
pub enum ReplyBody {
    /// Serve these bytes.
    Bytes(Bytes),
    /// Serve `prefix`, then fail the stream with a connection-reset error.
    FailAfter { prefix: Bytes, message: String },
    /// No body at all.
    Empty,
}

/// One scripted reply.
pub enum Reply {
    /// Complete with a response.
    Respond {
        status: u16,
        headers: HeaderMap,
        body: ReplyBody,
    },
    /// Complete with a transport failure.
    Fail(TransportError),
    /// Park the operation until the controller delivers a completion.
    Hold,
}

impl Reply {
    /// A response with a JSON body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json");
        Reply::Respond {
            status,
            headers,
            body: ReplyBody::Bytes(Bytes::from(body.into())),
        }
    }

    /// A response with no body.
    pub fn empty(status: u16) -> Self {
        Reply::Respond {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::Empty,
        }
    }

    /// A response whose body stream fails after `prefix`.
    pub fn broken_body(status: u16, prefix: impl Into<Bytes>, message: impl Into<String>) -> Self {
        Reply::Respond {
            status,
            headers: HeaderMap::new(),
            body: ReplyBody::FailAfter {
                prefix: prefix.into(),
                message: message.into(),
            },
        }
    }
}

#[derive(Default)]
struct OpState {
    handler: Mutex<Option<CompletionHandler>>,
    cancelled: AtomicBool,
}

struct Inner {
    script: Mutex<VecDeque<Reply>>,
    pending: Mutex<VecDeque<Arc<OpState>>>,
    cancels: AtomicUsize,
    requests: Mutex<Vec<Request>>,
}

/// In-memory transport serving a scripted queue of replies.
pub struct MemTransport {
    inner: Arc<Inner>,
}

impl MemTransport {
    /// Transport plus controller, with an empty script.
    pub fn new() -> (Self, MemController) {
        Self::scripted([])
    }

    /// Transport plus controller, preloaded with `replies` served in order.
    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> (Self, MemController) {
        let inner = Arc::new(Inner {
            script: Mutex::new(replies.into_iter().collect()),
            pending: Mutex::new(VecDeque::new()),
            cancels: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });
        (
            Self {
                inner: inner.clone(),
            },
            MemController { inner },
        )
    }
}

impl Transport for MemTransport {
    fn create_call(&self, request: Request) -> Arc<dyn TransportCall> {
        self.inner.requests.lock().unwrap().push(request);
        Arc::new(MemCall {
            inner: self.inner.clone(),
            op: Arc::new(OpState::default()),
        })
    }
}

struct MemCall {
    inner: Arc<Inner>,
    op: Arc<OpState>,
}

impl TransportCall for MemCall {
    fn enqueue(&self, on_complete: CompletionHandler) {
        if self.op.cancelled.load(Ordering::SeqCst) {
            on_complete(Err(TransportError::Cancelled));
            return;
        }
        let reply = self.inner.script.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Respond {
                status,
                headers,
                body,
            }) => {
                debug!(status, "serving scripted reply");
                on_complete(Ok(materialize(status, headers, body)));
            }
            Some(Reply::Fail(error)) => on_complete(Err(error)),
            Some(Reply::Hold) => {
                *self.op.handler.lock().unwrap() = Some(on_complete);
                self.inner.pending.lock().unwrap().push_back(self.op.clone());
            }
            None => on_complete(Err(TransportError::Protocol(
                "reply script exhausted".into(),
            ))),
        }
    }

    fn cancel(&self) {
        self.inner.cancels.fetch_add(1, Ordering::SeqCst);
        self.op.cancelled.store(true, Ordering::SeqCst);
        // A held operation completes with Cancelled, exactly once. Take
        // the handler out before invoking it so no lock is held while the
        // completion runs.
        let handler = self.op.handler.lock().unwrap().take();
        if let Some(handler) = handler {
            debug!("cancelling held operation");
            handler(Err(TransportError::Cancelled));
        }
    }
}

/// Drives held operations and inspects transport activity.
pub struct MemController {
    inner: Arc<Inner>,
}

impl MemController {
    /// Complete the oldest held operation with `reply`.
    ///
    /// Held operations whose handler was already consumed by a cancel are
    /// skipped. Returns `false` when nothing was left to complete.
    ///
    /// # Panics
    ///
    /// Panics if `reply` is [`Reply::Hold`].
    pub fn complete_next(&self, reply: Reply) -> bool {
        assert!(
            !matches!(reply, Reply::Hold),
            "cannot complete a held operation with Hold"
        );
        let mut reply = Some(reply);
        loop {
            let op = self.inner.pending.lock().unwrap().pop_front();
            let Some(op) = op else {
                return false;
            };
            let handler = op.handler.lock().unwrap().take();
            let Some(handler) = handler else {
                continue;
            };
            match reply.take() {
                Some(Reply::Respond {
                    status,
                    headers,
                    body,
                }) => handler(Ok(materialize(status, headers, body))),
                Some(Reply::Fail(error)) => handler(Err(error)),
                _ => unreachable!("reply consumed once"),
            }
            return true;
        }
    }

    /// Total `cancel()` calls seen by this transport.
    pub fn cancel_count(&self) -> usize {
        self.inner.cancels.load(Ordering::SeqCst)
    }

    /// Held operations still waiting for a completion.
    pub fn pending_count(&self) -> usize {
        self.inner
            .pending
            .lock()
            .unwrap()
            .iter()
            .filter(|op| op.handler.lock().unwrap().is_some())
            .count()
    }

    /// Requests dispatched so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.inner.requests.lock().unwrap().clone()
    }
}

fn materialize(status: u16, headers: HeaderMap, body: ReplyBody) -> RawResponse {
    let head = ResponseHead::new(status, headers);
    let source = match body {
        ReplyBody::Bytes(bytes) => BodySource::from_bytes(bytes),
        ReplyBody::Empty => BodySource::from_bytes(Bytes::new()),
        ReplyBody::FailAfter { prefix, message } => BodySource::new(FailingReader {
            prefix: io::Cursor::new(prefix),
            message,
        }),
    };
    RawResponse::new(head, source)
}

/// Reader that yields a prefix then fails every subsequent read.
struct FailingReader {
    prefix: io::Cursor<Bytes>,
    message: String,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.prefix.read(buf) {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                self.message.clone(),
            )),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Request {
        Request::new("GET", "http://api.test/thing", HeaderMap::new(), None)
    }

    #[test]
    fn scripted_reply_served_inline() {
        let (transport, controller) = MemTransport::scripted([Reply::json(200, r#"{"ok":true}"#)]);
        let call = transport.create_call(request());
        let raw = call.execute().unwrap();
        assert_eq!(raw.status(), 200);
        let (head, body) = raw.into_parts();
        assert_eq!(head.headers().get("content-type"), Some("application/json"));
        assert_eq!(body.buffer().unwrap().as_ref(), br#"{"ok":true}"#);
        assert_eq!(controller.requests().len(), 1);
    }

    #[test]
    fn held_operation_completes_via_controller() {
        let (transport, controller) = MemTransport::scripted([Reply::Hold]);
        let call = transport.create_call(request());

        let (tx, rx) = std::sync::mpsc::channel();
        call.enqueue(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        assert_eq!(controller.pending_count(), 1);
        assert!(rx.try_recv().is_err(), "held op must not complete yet");

        assert!(controller.complete_next(Reply::empty(204)));
        let raw = rx.recv().unwrap().unwrap();
        assert_eq!(raw.status(), 204);
        assert_eq!(controller.pending_count(), 0);
    }

    #[test]
    fn cancel_delivers_cancelled_once() {
        let (transport, controller) = MemTransport::scripted([Reply::Hold]);
        let call = transport.create_call(request());

        let (tx, rx) = std::sync::mpsc::channel();
        call.enqueue(Box::new(move |result| {
            let _ = tx.send(result);
        }));

        call.cancel();
        assert!(matches!(
            rx.recv().unwrap(),
            Err(TransportError::Cancelled)
        ));
        assert_eq!(controller.cancel_count(), 1);

        // A second cancel is counted but has no handler left to consume.
        call.cancel();
        assert_eq!(controller.cancel_count(), 2);
        assert!(rx.try_recv().is_err());

        // The controller finds nothing left to complete.
        assert!(!controller.complete_next(Reply::empty(200)));
    }

    #[test]
    fn exhausted_script_fails_loudly() {
        let (transport, _controller) = MemTransport::new();
        let call = transport.create_call(request());
        assert!(matches!(
            call.execute(),
            Err(TransportError::Protocol(_))
        ));
    }

    #[test]
    fn broken_body_fails_mid_read() {
        let (transport, _controller) =
            MemTransport::scripted([Reply::broken_body(200, &b"abc"[..], "reset")]);
        let call = transport.create_call(request());
        let (_, body) = call.execute().unwrap().into_parts();
        assert!(body.buffer().is_err());
    }
}
