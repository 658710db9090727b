use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::body::Body;
use crate::http::{HeaderMap, HeaderName, HeaderValue};

/// Payload attached to a platform request: the platform may have pre-parsed JSON,
/// handed over a raw buffer, or left a streaming upload untouched.
pub enum InboundBody {
    Json(serde_json::Value),
    Raw(Bytes),
    Stream(Body),
}

impl InboundBody {
    pub fn is_stream(&self) -> bool {
        matches!(self, InboundBody::Stream(_))
    }

    /// Recover the raw payload for consumers that need the original bytes,
    /// e.g. a streaming multipart parser. Pre-parsed JSON has no original
    /// bytes left to recover.
    pub fn into_raw(self) -> Option<Body> {
        match self {
            InboundBody::Json(_) => None,
            InboundBody::Raw(bytes) => Some(Body::from_bytes(bytes)),
            InboundBody::Stream(body) => Some(body),
        }
    }
}

impl fmt::Debug for InboundBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundBody::Json(value) => f.debug_tuple("InboundBody::Json").field(value).finish(),
            InboundBody::Raw(bytes) => f
                .debug_struct("InboundBody::Raw")
                .field("len", &bytes.len())
                .finish(),
            InboundBody::Stream(_) => f.debug_tuple("InboundBody::Stream").finish(),
        }
    }
}

/// Request value as delivered by the platform runtime. The URL may be partial or
/// absent; catch-all routing may deliver path segments as numeric-indexed query
/// keys (`"0"`, `"1"`, …) instead.
#[derive(Debug, Default)]
pub struct PlatformRequest {
    method: Option<String>,
    url: Option<String>,
    headers: HeaderMap,
    query: BTreeMap<String, String>,
    body: Option<InboundBody>,
}

/// Owned pieces of a [`PlatformRequest`], for consumers that need to move them.
pub struct InboundParts {
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: HeaderMap,
    pub query: BTreeMap<String, String>,
    pub body: Option<InboundBody>,
}

impl PlatformRequest {
    pub fn builder() -> PlatformRequestBuilder {
        PlatformRequestBuilder::default()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup. Missing or non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&InboundBody> {
        self.body.as_ref()
    }

    pub fn into_parts(self) -> InboundParts {
        InboundParts {
            method: self.method,
            url: self.url,
            headers: self.headers,
            query: self.query,
            body: self.body,
        }
    }
}

/// Builder mirroring how platform runtimes hand requests over. Invalid header
/// names or values are skipped rather than surfaced: a malformed header must
/// never fail request construction.
#[derive(Debug, Default)]
pub struct PlatformRequestBuilder {
    request: PlatformRequest,
}

impl PlatformRequestBuilder {
    pub fn method<S>(mut self, method: S) -> Self
    where
        S: Into<String>,
    {
        self.request.method = Some(method.into());
        self
    }

    pub fn url<S>(mut self, url: S) -> Self
    where
        S: Into<String>,
    {
        self.request.url = Some(url.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.request.headers.append(name, value);
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.request.headers = headers;
        self
    }

    pub fn query<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.request.query.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: InboundBody) -> Self {
        self.request.body = Some(body);
        self
    }

    pub fn build(self) -> PlatformRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn builder_collects_all_fields() {
        let request = PlatformRequest::builder()
            .method("post")
            .url("/videos/upload?draft=1")
            .header("Content-Type", "application/json")
            .query("draft", "1")
            .body(InboundBody::Json(serde_json::json!({"title": "tree planting"})))
            .build();

        assert_eq!(request.method(), Some("post"));
        assert_eq!(request.url(), Some("/videos/upload?draft=1"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.query().get("draft").map(String::as_str), Some("1"));
        assert!(matches!(request.body(), Some(InboundBody::Json(_))));
    }

    #[test]
    fn header_lookup_is_case_insensitive_and_total() {
        let request = PlatformRequest::builder()
            .header("X-Custom", "value")
            .build();
        assert_eq!(request.header("x-custom"), Some("value"));
        assert_eq!(request.header("missing"), None);
    }

    #[test]
    fn invalid_headers_are_skipped_not_fatal() {
        let request = PlatformRequest::builder()
            .header("bad header name", "value")
            .header("x-ok", "1")
            .build();
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("x-ok"), Some("1"));
    }

    #[test]
    fn raw_body_recovers_original_bytes() {
        let raw = InboundBody::Raw(Bytes::from_static(b"--boundary--"));
        let body = raw.into_raw().expect("raw body");
        let collected = block_on(body.collect()).expect("collect");
        assert_eq!(collected, Bytes::from_static(b"--boundary--"));
    }

    #[test]
    fn parsed_json_has_no_recoverable_bytes() {
        let parsed = InboundBody::Json(serde_json::json!({}));
        assert!(parsed.into_raw().is_none());
    }

    #[test]
    fn stream_body_passes_through_untouched() {
        let stream = InboundBody::Stream(Body::stream(futures_util::stream::iter(vec![
            Bytes::from_static(b"chunk"),
        ])));
        assert!(stream.is_stream());
        let body = stream.into_raw().expect("stream body");
        assert!(body.is_stream());
    }

    #[test]
    fn empty_request_has_no_signal() {
        let request = PlatformRequest::builder().build();
        assert_eq!(request.method(), None);
        assert_eq!(request.url(), None);
        assert!(request.query().is_empty());
        assert!(request.body().is_none());
    }
}
