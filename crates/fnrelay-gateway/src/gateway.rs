use std::time::Instant;

use tokio::sync::OnceCell;

use fnrelay_core::channel::ResponseChannel;
use fnrelay_core::dispatch::SharedDispatcher;
use fnrelay_core::error::RelayError;
use fnrelay_core::http::Method;
use fnrelay_core::inbound::PlatformRequest;
use fnrelay_core::signal::{Completion, CompletionCallback, CompletionSignal};
use fnrelay_core::track::{SharedChannel, TrackedResponse};

use crate::config::GatewayConfig;
use crate::init::{DispatcherLoader, InitError};
use crate::path::resolve_path;
use crate::translate::translate;

/// Adapts one platform invocation to the embedded dispatcher and guarantees
/// exactly one outbound response within the configured time bound.
///
/// The dispatcher handle is the only cross-request shared state: it is
/// initialized at most once per process, and a failed initialization leaves
/// the cell empty so the next request re-attempts.
pub struct Gateway {
    loader: DispatcherLoader,
    config: GatewayConfig,
    dispatcher: OnceCell<SharedDispatcher>,
}

impl Gateway {
    pub fn new(loader: DispatcherLoader) -> Self {
        Self::with_config(loader, GatewayConfig::default())
    }

    pub fn with_config(loader: DispatcherLoader, config: GatewayConfig) -> Self {
        Self {
            loader,
            config,
            dispatcher: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn dispatcher(&self) -> Result<SharedDispatcher, InitError> {
        self.dispatcher
            .get_or_try_init(|| self.loader.load())
            .await
            .cloned()
    }

    /// Relay one platform request. Resolves once a response has been sent or
    /// a guaranteed fallback has fired; every failure terminates locally.
    pub async fn handle(&self, request: PlatformRequest, channel: SharedChannel) {
        let started = Instant::now();
        let resolved = resolve_path(&request, self.config.mount_root());
        let translated = translate(request, &resolved);
        let method = translated.method().clone();
        let path = translated.path().to_string();

        let signal = CompletionSignal::new();
        let mut tracked = TrackedResponse::new(channel, signal.clone());

        let dispatcher = match self.dispatcher().await {
            Ok(dispatcher) => dispatcher,
            Err(err) => {
                let error = RelayError::init(anyhow::Error::new(err));
                send_fallback(&mut tracked, &error, &method, &path);
                log_request(&tracked, &method, &path, started);
                return;
            }
        };

        let done = CompletionCallback::new(signal.clone());
        let task_signal = signal.clone();
        let task_response = tracked.clone();
        tokio::spawn(async move {
            if let Err(err) = dispatcher.dispatch(translated, task_response, done).await {
                task_signal.resolve(Completion::Failed(err.message().to_string()));
            }
        });

        let outcome = match tokio::time::timeout(self.config.timeout(), signal.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // The dispatcher may still win the race at the deadline; the
                // first resolution stands.
                if signal.resolve(Completion::TimedOut) {
                    Completion::TimedOut
                } else {
                    signal.outcome().unwrap_or(Completion::TimedOut)
                }
            }
        };

        match outcome {
            Completion::Responded => {}
            Completion::Unhandled => {
                let error = RelayError::not_found(method.clone(), path.clone());
                send_fallback(&mut tracked, &error, &method, &path);
            }
            Completion::Failed(message) => {
                let error = RelayError::dispatch_failed(message);
                send_fallback(&mut tracked, &error, &method, &path);
            }
            Completion::TimedOut => {
                let error = RelayError::timeout(self.config.timeout_secs);
                send_fallback(&mut tracked, &error, &method, &path);
            }
        }

        log_request(&tracked, &method, &path, started);
    }
}

/// Answer an unhandled, failed, or timed-out activation. Skipped entirely when
/// headers are already out; a failing write is logged and swallowed.
fn send_fallback(response: &mut TrackedResponse, error: &RelayError, method: &Method, path: &str) {
    if response.headers_sent() {
        tracing::debug!(%method, path, "response already sent, skipping fallback");
        return;
    }

    match error {
        RelayError::NotFound { .. } => {
            tracing::debug!(%method, path, "no route matched");
        }
        RelayError::Timeout { seconds } => {
            tracing::warn!(%method, path, seconds, "dispatcher timed out");
        }
        other => match other.source_error() {
            Some(source) => {
                tracing::error!(%method, path, error = %other, source = %source, "dispatch failed");
            }
            None => tracing::error!(%method, path, error = %other, "dispatch failed"),
        },
    }

    let payload = serde_json::json!({
        "error": error.message(),
        "path": path,
        "method": method.as_str(),
    });

    response.set_status(error.status());
    if let Err(err) = response.send_json(&payload) {
        tracing::warn!(%method, path, error = %err, "failed to send fallback response");
    }
}

fn log_request(response: &TrackedResponse, method: &Method, path: &str, started: Instant) {
    let elapsed = started.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        "request method={} path={} status={} elapsed_ms={:.2}",
        method,
        path,
        response.status().as_u16(),
        elapsed
    );
}
