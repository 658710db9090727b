use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::body::Body;
use crate::http::{HeaderMap, Method};
use crate::inbound::InboundBody;
use crate::signal::CompletionCallback;
use crate::track::TrackedResponse;

/// Error a dispatcher reports through its callback or return value.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DispatchError {
    message: String,
}

impl DispatchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Request value shaped for the embedded dispatcher: canonical path and URL,
/// uppercased method, query and (initially empty) params maps, case-insensitive
/// header access, and the body rules the dispatcher's parsers rely on.
#[derive(Debug)]
pub struct DispatchRequest {
    method: Method,
    url: String,
    original_url: String,
    path: String,
    base_url: String,
    query: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    headers: HeaderMap,
    body: Option<InboundBody>,
    raw_body: Option<Body>,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>, query_string: Option<&str>) -> Self {
        let path = path.into();
        let url = match query_string {
            Some(query) if !query.is_empty() => format!("{path}?{query}"),
            _ => path.clone(),
        };
        Self {
            method,
            original_url: url.clone(),
            url,
            path,
            base_url: String::new(),
            query: BTreeMap::new(),
            params: BTreeMap::new(),
            headers: HeaderMap::new(),
            body: None,
            raw_body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Option<InboundBody>) -> Self {
        self.body = body;
        self
    }

    pub fn with_raw_body(mut self, raw_body: Option<Body>) -> Self {
        self.raw_body = raw_body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Always empty: the dispatcher sees the whole path as unmounted.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Route parameters are filled in by the dispatcher's own matcher.
    pub fn params_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.params
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup. Missing or non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> Option<&InboundBody> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<InboundBody> {
        self.body
    }

    pub fn raw_body(&self) -> Option<&Body> {
        self.raw_body.as_ref()
    }

    /// Hand the untouched payload to a streaming parser, leaving the request
    /// otherwise intact.
    pub fn take_raw_body(&mut self) -> Option<Body> {
        self.raw_body.take()
    }
}

/// The embedded routing application. External to the adapter: it either writes
/// through `response`, invokes `done` (with an error to report a failure,
/// without one to signal that no route matched), or returns `Err` — which the
/// gateway treats the same as a reported error.
#[async_trait]
pub trait Dispatcher: std::fmt::Debug + Send + Sync {
    async fn dispatch(
        &self,
        request: DispatchRequest,
        response: TrackedResponse,
        done: CompletionCallback,
    ) -> Result<(), DispatchError>;
}

pub type SharedDispatcher = Arc<dyn Dispatcher>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HeaderValue, Method};
    use bytes::Bytes;
    use futures::executor::block_on;

    fn headers(entries: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in entries {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn url_joins_path_and_query_string() {
        let request = DispatchRequest::new(Method::GET, "/api/users", Some("page=2"));
        assert_eq!(request.url(), "/api/users?page=2");
        assert_eq!(request.original_url(), "/api/users?page=2");
        assert_eq!(request.path(), "/api/users");
        assert_eq!(request.base_url(), "");
    }

    #[test]
    fn empty_query_string_leaves_url_bare() {
        let request = DispatchRequest::new(Method::GET, "/api/health", Some(""));
        assert_eq!(request.url(), "/api/health");

        let request = DispatchRequest::new(Method::GET, "/api/health", None);
        assert_eq!(request.url(), "/api/health");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = DispatchRequest::new(Method::POST, "/api/login", None)
            .with_headers(headers(&[("content-type", "application/json")]));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("authorization"), None);
    }

    #[test]
    fn params_start_empty_and_are_dispatcher_owned() {
        let mut request = DispatchRequest::new(Method::GET, "/api/users/42", None);
        assert!(request.params().is_empty());

        request.params_mut().insert("id".into(), "42".into());
        assert_eq!(request.params().get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn raw_body_is_taken_once() {
        let mut request = DispatchRequest::new(Method::POST, "/api/videos/upload", None)
            .with_raw_body(Some(Body::from_bytes(Bytes::from_static(b"--x--"))));

        let raw = request.take_raw_body().expect("raw body");
        let collected = block_on(raw.collect()).expect("collect");
        assert_eq!(collected, Bytes::from_static(b"--x--"));
        assert!(request.take_raw_body().is_none());
    }

    #[test]
    fn dispatch_error_wraps_anyhow_sources() {
        let err: DispatchError = anyhow::anyhow!("connection refused").into();
        assert_eq!(err.message(), "connection refused");
    }
}
