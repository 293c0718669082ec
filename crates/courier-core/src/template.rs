//! Request templating: an endpoint base plus per-call parameters.
//!
//! A [`RequestTemplate`] describes one request declaratively: method, a
//! path with `{name}` placeholders, query parameters, headers, and an
//! optional body. [`RequestTemplate::resolve`] turns it into a wire
//! [`Request`] against an [`Endpoint`]; failures happen there, before any
//! call state exists.

use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;

use crate::error::RequestError;
use crate::header::HeaderMap;
use crate::wire::Request;

/// Characters percent-encoded in query names and values.
const QUERY_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'%');

/// Characters percent-encoded in substituted path segments.
const PATH_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

/// A validated base endpoint, e.g. `http://api.example.com`.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(base: impl Into<String>) -> Result<Self, RequestError> {
        let base = base.into();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(RequestError::InvalidEndpoint(format!(
                "{base}: scheme must be http or https"
            )));
        }
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

/// Declarative description of one request against an endpoint.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: String,
    path: String,
    path_params: Vec<(String, String)>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl RequestTemplate {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            method: method.into(),
            path,
            path_params: Vec::new(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// Bind a `{name}` placeholder in the path.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attach a raw body with its content type.
    pub fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.headers.insert("content-type", content_type);
        self.body = Some(body.into());
        self
    }

    /// Attach `value` serialized as a JSON body.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, RequestError> {
        let body = serde_json::to_vec(value).map_err(|e| RequestError::Encode(e.to_string()))?;
        Ok(self.body("application/json", body))
    }

    /// Resolve the template into a transport-ready request.
    pub fn resolve(&self, endpoint: &Endpoint) -> Result<Request, RequestError> {
        let mut path = self.path.clone();
        for (name, value) in &self.path_params {
            let token = format!("{{{name}}}");
            if !path.contains(&token) {
                return Err(RequestError::UnknownPathParam(name.clone()));
            }
            let encoded = utf8_percent_encode(value, PATH_SET).to_string();
            path = path.replace(&token, &encoded);
        }
        if let Some(open) = path.find('{') {
            let name = path[open + 1..].split('}').next().unwrap_or_default();
            return Err(RequestError::UnresolvedPathParam(name.to_string()));
        }

        let mut url = format!("{}{}", endpoint.base(), path);
        if !self.query.is_empty() {
            let query = self
                .query
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(name, QUERY_SET),
                        utf8_percent_encode(value, QUERY_SET)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }

        Ok(Request::new(
            &self.method,
            url,
            self.headers.clone(),
            self.body.clone(),
        ))
    }
}
