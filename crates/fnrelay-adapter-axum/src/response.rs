use axum::body::Body as AxumBody;
use axum::http::Response;

use fnrelay_core::channel::BufferedResponse;

/// Materialise the buffered gateway response as an Axum/Hyper response.
pub fn into_axum_response(response: BufferedResponse) -> Response<AxumBody> {
    let (status, headers, body) = response.into_parts();

    let mut response = Response::new(AxumBody::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
