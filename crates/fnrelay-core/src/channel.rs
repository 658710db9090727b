use bytes::Bytes;
use thiserror::Error;

use crate::http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, StatusCode};

/// Failure while writing through a response channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("response already completed")]
    AlreadyCompleted,
    #[error("response serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("response channel failed: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Response-writing capability of the platform's outbound response object.
///
/// `send`, `send_json` and `end` are terminal: after any of them succeeds the
/// response is complete and `headers_sent` reports `true`.
pub trait ResponseChannel: Send {
    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Whether the response headers have gone out. Fallback logic must skip
    /// writing once this reports `true`.
    fn headers_sent(&self) -> bool;

    /// Terminal write carrying the full payload.
    fn send(&mut self, body: Bytes) -> Result<(), ChannelError>;

    /// Terminal write without further payload.
    fn end(&mut self) -> Result<(), ChannelError>;

    /// Terminal write serialising a JSON payload and tagging the content type.
    fn send_json(&mut self, value: &serde_json::Value) -> Result<(), ChannelError> {
        let payload = serde_json::to_vec(value)?;
        self.insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.send(Bytes::from(payload))
    }
}

/// In-memory [`ResponseChannel`]. Platform adapters hand one to the gateway
/// and materialise their native response from it once the activation
/// completes; tests read it back directly.
#[derive(Debug)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    completed: bool,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            completed: false,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseChannel for BufferedResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn headers_sent(&self) -> bool {
        self.completed
    }

    fn send(&mut self, body: Bytes) -> Result<(), ChannelError> {
        if self.completed {
            return Err(ChannelError::AlreadyCompleted);
        }
        self.body = body;
        self.completed = true;
        Ok(())
    }

    fn end(&mut self) -> Result<(), ChannelError> {
        if self.completed {
            return Err(ChannelError::AlreadyCompleted);
        }
        self.completed = true;
        Ok(())
    }
}
