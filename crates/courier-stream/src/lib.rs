//! Courier stream adapter: cancellable push-stream consumption of
//! one-shot calls.
//!
//! Calls are one-shot, so every subscription clones its prototype
//! [`Call`](courier_call::Call) and enqueues the clone; the completion is
//! forwarded through a channel and surfaces as at most one stream item
//! followed by the end of the stream. Dropping a stream mid-flight cancels
//! the cloned call and suppresses any completion that still arrives.
//!
//! Three packaging modes select the item shape, chosen at subscribe time
//! by constructor: full responses ([`CallStreamExt::responses`]), outcome
//! wrappers that never fail the stream ([`CallStreamExt::results`]), or
//! bare decoded bodies ([`CallStreamExt::bodies`]).

mod adapter;
mod outcome;
mod subscription;

pub use adapter::{BodyStream, CallStreamExt, ResponseStream, ResultStream};
pub use outcome::Outcome;
