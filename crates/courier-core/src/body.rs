//! Response body primitives.
//!
//! [`BodySource`] is the live body handed over by a transport: a one-shot
//! readable source with a size bound on buffering. It is consumed and
//! dropped exactly once while the typed response is constructed.
//! [`IoCaptureReader`] wraps a source so a downstream decode failure can be
//! attributed to the stream rather than to the codec.

use std::io::{self, Read};

use bytes::Bytes;

use crate::error::TransportError;

/// Default cap on buffered response bodies (8 MiB).
pub const DEFAULT_BODY_LIMIT: u64 = 8 * 1024 * 1024;

/// The live body of one completed transport response.
///
/// Dropping the source releases the underlying reader; there is no
/// separate close step.
pub struct BodySource {
    reader: Box<dyn Read + Send>,
    limit: u64,
}

impl BodySource {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self::with_limit(reader, DEFAULT_BODY_LIMIT)
    }

    /// A source whose [`buffer`](BodySource::buffer) is bounded to `limit`
    /// bytes.
    pub fn with_limit(reader: impl Read + Send + 'static, limit: u64) -> Self {
        Self {
            reader: Box::new(reader),
            limit,
        }
    }

    /// A source over bytes that are already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::with_limit(io::Cursor::new(bytes.into()), u64::MAX)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Read the whole source into memory, honoring the size bound.
    pub fn buffer(mut self) -> Result<Bytes, TransportError> {
        let mut buf = Vec::new();
        let mut bounded = (&mut self.reader).take(self.limit.saturating_add(1));
        bounded.read_to_end(&mut buf)?;
        if buf.len() as u64 > self.limit {
            return Err(TransportError::BodyTooLarge { limit: self.limit });
        }
        Ok(Bytes::from(buf))
    }
}

impl Read for BodySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for BodySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodySource")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

/// Wraps a reader and records the first I/O failure it produces.
///
/// Codecs fold read failures into their own error type; the capture lets
/// the decode site re-attribute such a failure to the transport.
pub struct IoCaptureReader<R> {
    inner: R,
    captured: Option<io::Error>,
}

impl<R: Read> IoCaptureReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            captured: None,
        }
    }

    /// The first I/O error seen, if any.
    pub fn take_io_error(&mut self) -> Option<io::Error> {
        self.captured.take()
    }
}

impl<R: Read> Read for IoCaptureReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                if self.captured.is_none() {
                    self.captured = Some(io::Error::new(e.kind(), e.to_string()));
                }
                Err(e)
            }
        }
    }
}
