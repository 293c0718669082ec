//! Courier call lifecycle: one-shot execution, response decoding, and
//! callback dispatch.
//!
//! A [`Call`] owns one logical request and executes at most once, either
//! blocking ([`Call::execute`]) or asynchronously ([`Call::enqueue`]) with
//! a [`Callback`] sink. Completed transport responses are decoded into
//! [`Response`] values by status-code policy: success statuses go through
//! the codec, failure statuses buffer the raw error body for lazy decoding,
//! and 204/205 carry nothing.
//!
//! [`Client`] is the front door: it binds an endpoint, a transport, a codec
//! and an optional callback executor, and resolves request templates into
//! typed calls.

pub mod call;
pub mod callback;
pub mod client;
pub mod error;
pub mod response;

pub use call::Call;
pub use callback::{Callback, CallbackExecutor, Job, TokioExecutor, callback};
pub use client::{Client, ClientBuilder};
pub use error::{CallError, CallResult};
pub use response::Response;
