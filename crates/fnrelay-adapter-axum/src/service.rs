use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use axum::body::Body as AxumBody;
use axum::http::{Request, Response};
use http::StatusCode;
use tower::Service;

use fnrelay_core::channel::BufferedResponse;
use fnrelay_core::track::SharedChannel;
use fnrelay_gateway::gateway::Gateway;

use crate::request::into_platform_request;
use crate::response::into_axum_response;

/// Tower service exposing the gateway to Axum/Hyper: each call converts the
/// incoming request to the platform model, hands the gateway a buffered
/// channel, and materialises whatever the activation wrote into it.
#[derive(Clone)]
pub struct FnRelayAxumService {
    gateway: Arc<Gateway>,
}

impl FnRelayAxumService {
    pub fn new(gateway: Gateway) -> Self {
        Self::from_shared(Arc::new(gateway))
    }

    pub fn from_shared(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }
}

impl Service<Request<AxumBody>> for FnRelayAxumService {
    type Response = Response<AxumBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<AxumBody>) -> Self::Future {
        let gateway = Arc::clone(&self.gateway);
        Box::pin(async move {
            let platform_request = match into_platform_request(request).await {
                Ok(request) => request,
                Err(message) => {
                    tracing::debug!(error = %message, "rejecting malformed request");
                    let mut response = Response::new(AxumBody::from(message));
                    *response.status_mut() = StatusCode::BAD_REQUEST;
                    return Ok(response);
                }
            };

            let buffered = Arc::new(Mutex::new(BufferedResponse::new()));
            let channel: SharedChannel = buffered.clone();
            gateway.handle(platform_request, channel).await;

            // The gateway has fired a terminal write by now; a straggling
            // dispatcher task only ever sees the abandoned default.
            let response = {
                let mut guard = buffered.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *guard)
            };
            Ok(into_axum_response(response))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use fnrelay_core::channel::ResponseChannel;
    use fnrelay_core::dispatch::{DispatchError, DispatchRequest, Dispatcher};
    use fnrelay_core::signal::CompletionCallback;
    use fnrelay_core::track::TrackedResponse;
    use fnrelay_gateway::init::DispatcherLoader;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct PathEcho;

    #[async_trait]
    impl Dispatcher for PathEcho {
        async fn dispatch(
            &self,
            request: DispatchRequest,
            mut response: TrackedResponse,
            done: CompletionCallback,
        ) -> Result<(), DispatchError> {
            if request.path() == "/api/echo" {
                response
                    .send(Bytes::from(request.url().to_string()))
                    .map_err(|err| DispatchError::new(err.to_string()))?;
            } else {
                done.invoke(None);
            }
            Ok(())
        }
    }

    fn service() -> FnRelayAxumService {
        let loader = DispatcherLoader::from_instance(Arc::new(PathEcho));
        FnRelayAxumService::new(Gateway::new(loader))
    }

    #[tokio::test]
    async fn routes_a_request_through_the_gateway() {
        let mut service = service();
        let request = Request::builder()
            .uri("/echo?page=2")
            .body(AxumBody::empty())
            .unwrap();

        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), b"/api/echo?page=2");
    }

    #[tokio::test]
    async fn unmatched_route_surfaces_the_gateway_404() {
        let mut service = service();
        let request = Request::builder()
            .uri("/missing")
            .body(AxumBody::empty())
            .unwrap();

        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["path"], "/api/missing");
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_before_dispatch() {
        let mut service = service();
        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("content-type", "application/json")
            .body(AxumBody::from("{broken"))
            .unwrap();

        let response = service.ready().await.unwrap().call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
