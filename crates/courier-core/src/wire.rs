//! Wire-level request and response records.

use bytes::Bytes;

use crate::body::BodySource;
use crate::header::HeaderMap;

/// A transport-ready request: the immutable output of request building.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers,
            body,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// Status and headers of a completed transport response, with the body
/// detached so the record can be passed around freely.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: u16,
    headers: HeaderMap,
}

impl ResponseHead {
    pub fn new(status: u16, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `true` if the status is in the range [200, 300).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A completed transport response still carrying its live body source.
#[derive(Debug)]
pub struct RawResponse {
    head: ResponseHead,
    body: BodySource,
}

impl RawResponse {
    pub fn new(head: ResponseHead, body: BodySource) -> Self {
        Self { head, body }
    }

    pub fn status(&self) -> u16 {
        self.head.status()
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// Detach the body from the head. The caller owns the live source and
    /// is responsible for consuming it exactly once.
    pub fn into_parts(self) -> (ResponseHead, BodySource) {
        (self.head, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        assert!(ResponseHead::new(200, HeaderMap::new()).is_success());
        assert!(ResponseHead::new(299, HeaderMap::new()).is_success());
        assert!(!ResponseHead::new(199, HeaderMap::new()).is_success());
        assert!(!ResponseHead::new(300, HeaderMap::new()).is_success());
        assert!(!ResponseHead::new(404, HeaderMap::new()).is_success());
    }

    #[test]
    fn into_parts_detaches_body() {
        let raw = RawResponse::new(
            ResponseHead::new(200, HeaderMap::new()),
            BodySource::from_bytes(&b"payload"[..]),
        );
        let (head, body) = raw.into_parts();
        assert_eq!(head.status(), 200);
        assert_eq!(body.buffer().unwrap().as_ref(), b"payload");
    }
}
