use anyhow::Error as AnyError;
use thiserror::Error;

use crate::http::{Method, StatusCode};

/// Adapter-level error that carries the HTTP status the guard answers with.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{message}")]
    BadRequest { message: String },
    #[error("no route matched: {method} {path}")]
    NotFound { method: Method, path: String },
    #[error("dispatcher error: {message}")]
    DispatchFailed { message: String },
    #[error("dispatcher did not respond within {seconds}s")]
    Timeout { seconds: u64 },
    #[error("dispatcher initialization failed: {source}")]
    Init {
        #[from]
        source: AnyError,
    },
}

impl RelayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        RelayError::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(method: Method, path: impl Into<String>) -> Self {
        RelayError::NotFound {
            method,
            path: path.into(),
        }
    }

    pub fn dispatch_failed(message: impl Into<String>) -> Self {
        RelayError::DispatchFailed {
            message: message.into(),
        }
    }

    pub fn timeout(seconds: u64) -> Self {
        RelayError::Timeout { seconds }
    }

    pub fn init<E>(error: E) -> Self
    where
        E: Into<AnyError>,
    {
        RelayError::Init {
            source: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RelayError::NotFound { .. } => StatusCode::NOT_FOUND,
            RelayError::DispatchFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Init { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal detail (sources, backtraces) stays in the log.
    pub fn message(&self) -> String {
        match self {
            RelayError::Init { .. } => "dispatcher initialization failed".to_string(),
            other => other.to_string(),
        }
    }

    pub fn source_error(&self) -> Option<&AnyError> {
        match self {
            RelayError::Init { source } => Some(source),
            _ => None,
        }
    }
}
