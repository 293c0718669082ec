//! Plaintext HTTP/1.1 transport on hyper's client connection API.
//!
//! One TCP connection per operation: connect, handshake, send, collect.
//! There is no pooling, redirect following, or retry here; those are
//! out of scope for the call runtime, and a richer transport can be
//! plugged in behind the same [`Transport`] contract. Operations run as
//! tasks on the tokio runtime captured at construction; cancellation
//! drops the in-flight future, which aborts the connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::debug;

use courier_core::{
    BodySource, CompletionHandler, DEFAULT_BODY_LIMIT, HeaderMap, RawResponse, Request,
    ResponseHead, Transport, TransportCall, TransportError,
};

/// Tunables for [`HyperTransport`].
#[derive(Debug, Clone)]
pub struct HyperTransportConfig {
    /// Whole-operation deadline: connect, send, and body collection.
    pub timeout: Duration,
    /// Cap on collected response bodies.
    pub body_limit: u64,
}

impl Default for HyperTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

/// HTTP/1.1 transport over plain TCP.
pub struct HyperTransport {
    handle: tokio::runtime::Handle,
    config: HyperTransportConfig,
}

impl HyperTransport {
    /// Capture the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime context; use
    /// [`with_handle`](HyperTransport::with_handle) from plain threads.
    pub fn new(config: HyperTransportConfig) -> Self {
        Self::with_handle(tokio::runtime::Handle::current(), config)
    }

    pub fn with_handle(handle: tokio::runtime::Handle, config: HyperTransportConfig) -> Self {
        Self { handle, config }
    }
}

impl Transport for HyperTransport {
    fn create_call(&self, request: Request) -> Arc<dyn TransportCall> {
        Arc::new(HyperCall {
            handle: self.handle.clone(),
            config: self.config.clone(),
            request,
            state: Arc::new(CancelState::default()),
        })
    }
}

#[derive(Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

struct HyperCall {
    handle: tokio::runtime::Handle,
    config: HyperTransportConfig,
    request: Request,
    state: Arc<CancelState>,
}

impl TransportCall for HyperCall {
    fn enqueue(&self, on_complete: CompletionHandler) {
        if self.state.cancelled.load(Ordering::SeqCst) {
            on_complete(Err(TransportError::Cancelled));
            return;
        }

        let request = self.request.clone();
        let config = self.config.clone();
        let state = self.state.clone();

        self.handle.spawn(async move {
            let work = run_request(&request, &config);
            let result = tokio::select! {
                // notify_one stores a permit, so a cancel that landed
                // before this task was polled still wins immediately.
                _ = state.notify.notified() => Err(TransportError::Cancelled),
                result = work => result,
            };
            on_complete(result);
        });
    }

    fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_one();
        debug!(url = %self.request.url(), "cancellation requested");
    }
}

async fn run_request(
    request: &Request,
    config: &HyperTransportConfig,
) -> Result<RawResponse, TransportError> {
    match tokio::time::timeout(config.timeout, drive(request, config.body_limit)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(config.timeout)),
    }
}

async fn drive(request: &Request, body_limit: u64) -> Result<RawResponse, TransportError> {
    let target = Target::parse(request.url())?;

    let stream = TcpStream::connect((target.host.as_str(), target.port))
        .await
        .map_err(|e| TransportError::Connect(format!("{}: {e}", target.authority())))?;
    let io = TokioIo::new(stream);

    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut builder = http::Request::builder()
        .method(request.method())
        .uri(request.url())
        .header(http::header::HOST, target.authority());
    for header in request.headers().iter() {
        builder = builder.header(header.name.as_str(), header.value.as_str());
    }
    let body = request.body().cloned().unwrap_or_else(Bytes::new);
    let wire = builder
        .body(Full::new(body))
        .map_err(|e| TransportError::Protocol(e.to_string()))?;

    let response = sender
        .send_request(wire)
        .await
        .map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))?;

    let status = response.status().as_u16();
    let mut headers = HeaderMap::new();
    for (name, value) in response.headers() {
        headers.insert(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    debug!(status, url = %request.url(), "response received");

    let collected = Limited::new(response.into_body(), body_limit as usize)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                TransportError::BodyTooLarge { limit: body_limit }
            } else {
                TransportError::Io(std::io::Error::other(e.to_string()))
            }
        })?;

    Ok(RawResponse::new(
        ResponseHead::new(status, headers),
        BodySource::from_bytes(collected.to_bytes()),
    ))
}

struct Target {
    host: String,
    port: u16,
}

impl Target {
    fn parse(url: &str) -> Result<Self, TransportError> {
        let uri: http::Uri = url
            .parse()
            .map_err(|e| TransportError::Protocol(format!("invalid url {url}: {e}")))?;
        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => {
                return Err(TransportError::Protocol(format!(
                    "unsupported scheme {other}; this transport speaks plaintext http only"
                )));
            }
            None => {
                return Err(TransportError::Protocol(format!(
                    "relative url {url}; an absolute http url is required"
                )));
            }
        }
        let host = uri
            .host()
            .ok_or_else(|| TransportError::Protocol(format!("url {url} has no host")))?
            .to_string();
        let port = uri.port_u16().unwrap_or(80);
        Ok(Self { host, port })
    }

    fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_default_port() {
        let target = Target::parse("http://api.test/users").unwrap();
        assert_eq!(target.host, "api.test");
        assert_eq!(target.port, 80);
        assert_eq!(target.authority(), "api.test:80");
    }

    #[test]
    fn parses_explicit_port() {
        let target = Target::parse("http://127.0.0.1:8080/healthz").unwrap();
        assert_eq!(target.host, "127.0.0.1");
        assert_eq!(target.port, 8080);
    }

    #[test]
    fn rejects_https_and_relative_urls() {
        assert!(matches!(
            Target::parse("https://api.test/"),
            Err(TransportError::Protocol(_))
        ));
        assert!(matches!(
            Target::parse("/users/7"),
            Err(TransportError::Protocol(_))
        ));
    }
}
