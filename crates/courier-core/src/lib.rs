//! Courier wire layer: the types and contracts shared by the call runtime.
//!
//! This crate defines:
//! - Wire records ([`Request`], [`RawResponse`], [`ResponseHead`])
//! - Header handling ([`Header`], [`HeaderMap`])
//! - The response body source ([`BodySource`], [`IoCaptureReader`])
//! - The transport capability ([`Transport`], [`TransportCall`])
//! - The body converter contract ([`Codec`]) and its JSON implementation
//! - Request templating ([`Endpoint`], [`RequestTemplate`])
//! - The wire-level error taxonomy
//!
//! The call lifecycle itself (one-shot execution, callbacks, streams) lives
//! in the `courier-call` and `courier-stream` crates; concrete transports
//! live in `courier-transport-*` crates.

pub mod body;
pub mod codec;
pub mod error;
pub mod header;
pub mod template;
pub mod transport;
pub mod wire;

pub use body::{BodySource, IoCaptureReader, DEFAULT_BODY_LIMIT};
pub use codec::{Codec, JsonCodec};
pub use error::{DecodeError, RequestError, TransportError};
pub use header::{Header, HeaderMap};
pub use template::{Endpoint, RequestTemplate};
pub use transport::{CompletionHandler, Transport, TransportCall};
pub use wire::{RawResponse, Request, ResponseHead};
