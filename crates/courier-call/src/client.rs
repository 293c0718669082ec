//! The client front door: endpoint, transport, codec, callback executor.

use std::sync::Arc;

use courier_core::{Codec, Endpoint, JsonCodec, RequestError, RequestTemplate, Transport};
use serde::de::DeserializeOwned;

use crate::call::Call;
use crate::callback::CallbackExecutor;

/// Builds typed one-shot calls against a single endpoint.
pub struct Client<C: Codec = JsonCodec> {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    codec: Arc<C>,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
}

impl Client<JsonCodec> {
    /// Start building a JSON client for `endpoint` over `transport`.
    pub fn builder(endpoint: Endpoint, transport: Arc<dyn Transport>) -> ClientBuilder<JsonCodec> {
        ClientBuilder {
            endpoint,
            transport,
            codec: JsonCodec,
            callback_executor: None,
        }
    }
}

impl<C: Codec> Client<C> {
    /// Resolve `template` into a one-shot call decoding to `T`.
    ///
    /// Template failures surface here, before any call state exists.
    pub fn new_call<T: DeserializeOwned>(
        &self,
        template: &RequestTemplate,
    ) -> Result<Call<T, C>, RequestError> {
        let request = template.resolve(&self.endpoint)?;
        Ok(Call::new(
            Arc::new(request),
            self.transport.clone(),
            self.codec.clone(),
            self.callback_executor.clone(),
        ))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder<C: Codec> {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    codec: C,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
}

impl<C: Codec> ClientBuilder<C> {
    /// Swap the body codec.
    pub fn codec<D: Codec>(self, codec: D) -> ClientBuilder<D> {
        ClientBuilder {
            endpoint: self.endpoint,
            transport: self.transport,
            codec,
            callback_executor: self.callback_executor,
        }
    }

    /// Dispatch callbacks through `executor` instead of inline on the
    /// transport's completion thread.
    pub fn callback_executor(mut self, executor: Arc<dyn CallbackExecutor>) -> Self {
        self.callback_executor = Some(executor);
        self
    }

    pub fn build(self) -> Client<C> {
        Client {
            endpoint: self.endpoint,
            transport: self.transport,
            codec: Arc::new(self.codec),
            callback_executor: self.callback_executor,
        }
    }
}
