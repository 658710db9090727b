use std::collections::BTreeMap;

use axum::body::Body as AxumBody;
use axum::http::Request;
use http::header::CONTENT_TYPE;

use fnrelay_core::body::Body;
use fnrelay_core::inbound::{InboundBody, PlatformRequest};
use fnrelay_gateway::translate::MULTIPART_CONTENT_TYPE;

/// Convert an Axum/Hyper request into the platform inbound model, applying the
/// same body rules the serverless platform applies: JSON payloads arrive
/// pre-parsed, multipart payloads arrive as an untouched stream, everything
/// else arrives as a raw buffer.
pub async fn into_platform_request(
    request: Request<AxumBody>,
) -> Result<PlatformRequest, String> {
    let (parts, body) = request.into_parts();

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let query = parts.uri.query().map(parse_query).unwrap_or_default();

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    let body = if content_type.contains(MULTIPART_CONTENT_TYPE) {
        Some(InboundBody::Stream(Body::from_stream(
            body.into_data_stream(),
        )))
    } else {
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|err| format!("failed to read request body: {err}"))?;
        if bytes.is_empty() {
            None
        } else if is_json_content_type(&content_type) {
            let value = serde_json::from_slice(&bytes)
                .map_err(|err| format!("invalid JSON payload: {err}"))?;
            Some(InboundBody::Json(value))
        } else {
            Some(InboundBody::Raw(bytes))
        }
    };

    let mut builder = PlatformRequest::builder()
        .method(parts.method.as_str())
        .url(url)
        .headers(parts.headers);
    for (key, value) in query {
        builder = builder.query(key, value);
    }
    if let Some(body) = body {
        builder = builder.body(body);
    }

    Ok(builder.build())
}

fn parse_query(raw: &str) -> BTreeMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}

fn is_json_content_type(content_type: &str) -> bool {
    let media_type = content_type.split(';').next().map(str::trim).unwrap_or("");
    if media_type == "application/json" {
        return true;
    }

    let Some((ty, subtype)) = media_type.split_once('/') else {
        return false;
    };

    ty == "application" && subtype.ends_with("+json")
}
