//! Body converter contract and the stock JSON codec.

use std::io::Read;

use serde::de::DeserializeOwned;

use crate::error::DecodeError;

/// Translates response bytes into typed values.
///
/// `from_reader` consumes a live body source exactly once. `from_slice`
/// decodes an already-buffered source and is what lazy error-body decoding
/// uses; with the bytes in memory it can only fail with a conversion error.
pub trait Codec: Send + Sync + 'static {
    fn from_reader<T: DeserializeOwned>(&self, reader: &mut dyn Read) -> Result<T, DecodeError>;

    fn from_slice<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError>;
}

/// serde_json-backed codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn from_reader<T: DeserializeOwned>(&self, reader: &mut dyn Read) -> Result<T, DecodeError> {
        serde_json::from_reader(reader).map_err(|e| DecodeError::Malformed(e.to_string()))
    }

    fn from_slice<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}
