use fnrelay_core::dispatch::DispatchRequest;
use fnrelay_core::http::{header::CONTENT_TYPE, HeaderMap, Method};
use fnrelay_core::inbound::{InboundBody, PlatformRequest};

use crate::path::ResolvedPath;

/// Content type marking a streaming multipart payload.
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/form-data";

/// Build the dispatcher-shaped request from the platform request and the
/// resolved path.
///
/// The method is uppercased and defaults to `GET`. For multipart payloads the
/// parsed body is dropped — a downstream multipart parser must see the
/// original bytes, so whatever raw payload the platform left us (a buffer or
/// an untouched stream) is surfaced as the raw body instead. Every other
/// content type passes its body through unchanged.
pub fn translate(request: PlatformRequest, resolved: &ResolvedPath) -> DispatchRequest {
    let parts = request.into_parts();

    let method = parts
        .method
        .as_deref()
        .and_then(|name| Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes()).ok())
        .unwrap_or(Method::GET);

    let (body, raw_body) = if is_multipart(&parts.headers) {
        (None, parts.body.and_then(InboundBody::into_raw))
    } else {
        (parts.body, None)
    };

    DispatchRequest::new(method, resolved.path(), resolved.query())
        .with_headers(parts.headers)
        .with_query(parts.query)
        .with_body(body)
        .with_raw_body(raw_body)
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains(MULTIPART_CONTENT_TYPE))
        .unwrap_or(false)
}
