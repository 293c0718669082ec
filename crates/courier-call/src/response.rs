//! Typed responses and the status-code decoding policy.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use courier_core::{
    Codec, DecodeError, HeaderMap, IoCaptureReader, JsonCodec, RawResponse, ResponseHead,
    TransportError,
};
use serde::de::DeserializeOwned;

use crate::error::{CallError, CallResult};

/// The immutable, decoded-or-buffered result of one completed transport
/// operation.
///
/// Exactly one of [`body`](Response::body) and
/// [`error_body`](Response::error_body) is populated, except for statuses
/// 204 and 205 where both are absent.
pub struct Response<T, C: Codec = JsonCodec> {
    head: ResponseHead,
    body: Option<T>,
    error_body: Option<Bytes>,
    codec: Arc<C>,
}

impl<T, C: Codec> Response<T, C> {
    fn new(head: ResponseHead, body: Option<T>, error_body: Option<Bytes>, codec: Arc<C>) -> Self {
        Self {
            head,
            body,
            error_body,
            codec,
        }
    }

    pub fn status(&self) -> u16 {
        self.head.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.head.headers()
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// `true` if the status is in [200, 300).
    pub fn is_success(&self) -> bool {
        self.head.is_success()
    }

    /// The decoded body of a successful response.
    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Consume the response into its decoded body.
    pub fn into_body(self) -> Option<T> {
        self.body
    }

    /// The buffered raw body of an unsuccessful response.
    pub fn error_body(&self) -> Option<&Bytes> {
        self.error_body.as_ref()
    }

    /// Decode the buffered error body as `E`; `None` when the response
    /// carries no error body.
    ///
    /// The bytes are fully buffered, so repeated calls decode the same
    /// input and an I/O failure is impossible here; only a conversion
    /// failure can occur.
    pub fn error_body_as<E: DeserializeOwned>(&self) -> Option<Result<E, DecodeError>> {
        self.error_body
            .as_ref()
            .map(|bytes| self.codec.from_slice(bytes))
    }
}

impl<T: fmt::Debug, C: Codec> fmt::Debug for Response<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status())
            .field("body", &self.body)
            .field("error_body_len", &self.error_body.as_ref().map(Bytes::len))
            .finish()
    }
}

/// Decode one completed transport response.
///
/// Policy, in order: a non-success status buffers the raw error body
/// (bounded by the transport's limit) without invoking the codec; 204 and
/// 205 carry nothing and skip the codec too; anything else is decoded
/// through an I/O-capturing reader so a failure of the underlying source
/// is attributed to the transport rather than to the codec. The body
/// source is consumed and dropped here, exactly once, on every branch.
pub(crate) fn decode_response<T, C>(raw: RawResponse, codec: Arc<C>) -> CallResult<Response<T, C>>
where
    T: DeserializeOwned,
    C: Codec,
{
    let (head, body) = raw.into_parts();

    if !head.is_success() {
        let buffered = body.buffer()?;
        return Ok(Response::new(head, None, Some(buffered), codec));
    }

    if head.status() == 204 || head.status() == 205 {
        drop(body);
        return Ok(Response::new(head, None, None, codec));
    }

    let mut tracked = IoCaptureReader::new(body);
    match codec.from_reader::<T>(&mut tracked) {
        Ok(value) => Ok(Response::new(head, Some(value), None, codec)),
        Err(decode_err) => match tracked.take_io_error() {
            Some(io) => Err(CallError::Transport(TransportError::Io(io))),
            None => Err(CallError::Decode(decode_err)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::BodySource;
    use std::io::{self, Read};

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct ApiError {
        code: String,
    }

    /// Codec that must never be reached.
    struct NoCallCodec;

    impl Codec for NoCallCodec {
        fn from_reader<T: DeserializeOwned>(
            &self,
            _reader: &mut dyn Read,
        ) -> Result<T, DecodeError> {
            panic!("codec must not be invoked");
        }

        fn from_slice<T: DeserializeOwned>(&self, _bytes: &[u8]) -> Result<T, DecodeError> {
            panic!("codec must not be invoked");
        }
    }

    /// Reader that yields a prefix then fails.
    struct FailingReader {
        prefix: io::Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.prefix.read(buf) {
                Ok(0) => Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "peer went away",
                )),
                other => other,
            }
        }
    }

    fn raw(status: u16, body: BodySource) -> RawResponse {
        RawResponse::new(ResponseHead::new(status, HeaderMap::new()), body)
    }

    #[test]
    fn success_body_is_decoded() {
        let response: Response<User> = decode_response(
            raw(200, BodySource::from_bytes(&br#"{"id":7,"name":"ada"}"#[..])),
            Arc::new(JsonCodec),
        )
        .unwrap();

        assert!(response.is_success());
        assert_eq!(
            response.body(),
            Some(&User {
                id: 7,
                name: "ada".into()
            })
        );
        assert!(response.error_body().is_none());
        assert!(response.error_body_as::<ApiError>().is_none());
    }

    #[test]
    fn failure_status_buffers_error_body() {
        let response: Response<User> = decode_response(
            raw(404, BodySource::from_bytes(&br#"{"code":"missing"}"#[..])),
            Arc::new(JsonCodec),
        )
        .unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status(), 404);
        assert!(response.body().is_none());
        assert_eq!(response.error_body().unwrap().as_ref(), br#"{"code":"missing"}"#);

        // Lazy decode is deterministic and repeatable over the buffer.
        let first: ApiError = response.error_body_as().unwrap().unwrap();
        let second: ApiError = response.error_body_as().unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.code, "missing");
    }

    #[test]
    fn no_content_skips_the_codec() {
        for status in [204, 205] {
            let response: Response<User, NoCallCodec> = decode_response(
                raw(status, BodySource::from_bytes(Bytes::new())),
                Arc::new(NoCallCodec),
            )
            .unwrap();

            assert!(response.is_success());
            assert!(response.body().is_none());
            assert!(response.error_body().is_none());
        }
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let err = decode_response::<User, _>(
            raw(200, BodySource::from_bytes(&b"not json"[..])),
            Arc::new(JsonCodec),
        )
        .unwrap_err();
        assert!(matches!(err, CallError::Decode(_)));
    }

    #[test]
    fn stream_failure_is_attributed_to_the_transport() {
        let body = BodySource::new(FailingReader {
            prefix: io::Cursor::new(br#"{"id":7,"#.to_vec()),
        });
        let err = decode_response::<User, _>(raw(200, body), Arc::new(JsonCodec)).unwrap_err();
        match err {
            CallError::Transport(TransportError::Io(io)) => {
                assert_eq!(io.kind(), io::ErrorKind::ConnectionReset);
            }
            other => panic!("expected transport attribution, got {other:?}"),
        }
    }

    #[test]
    fn oversized_error_body_is_bounded() {
        let body = BodySource::with_limit(io::Cursor::new(vec![b'x'; 64]), 16);
        let err = decode_response::<User, _>(raw(500, body), Arc::new(JsonCodec)).unwrap_err();
        assert!(matches!(
            err,
            CallError::Transport(TransportError::BodyTooLarge { limit: 16 })
        ));
    }

    #[test]
    fn error_status_with_bad_json_defers_the_failure() {
        // Buffering never decodes; only error_body_as surfaces the problem.
        let response: Response<User> = decode_response(
            raw(500, BodySource::from_bytes(&b"<html>oops</html>"[..])),
            Arc::new(JsonCodec),
        )
        .unwrap();
        let decoded = response.error_body_as::<ApiError>().unwrap();
        assert!(decoded.is_err());
    }
}
