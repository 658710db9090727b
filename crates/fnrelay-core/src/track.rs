use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::channel::{ChannelError, ResponseChannel};
use crate::http::{HeaderName, HeaderValue, StatusCode};
use crate::signal::{Completion, CompletionSignal};

/// Type-erased, shareable handle to the platform's response object.
pub type SharedChannel = Arc<Mutex<dyn ResponseChannel>>;

/// Completion-tracking decorator around the platform response.
///
/// Wraps the channel instead of mutating it in place: terminal writes are
/// forwarded to the inner channel first, the completion signal is resolved
/// afterwards, and the inner result is propagated unchanged. Resolution is
/// idempotent, so however many write paths the dispatcher takes, the outer
/// activation observes exactly one completion.
#[derive(Clone)]
pub struct TrackedResponse {
    channel: SharedChannel,
    signal: CompletionSignal,
}

impl TrackedResponse {
    pub fn new(channel: SharedChannel, signal: CompletionSignal) -> Self {
        Self { channel, signal }
    }

    pub fn from_channel<C>(channel: C, signal: CompletionSignal) -> Self
    where
        C: ResponseChannel + 'static,
    {
        Self::new(Arc::new(Mutex::new(channel)), signal)
    }

    pub fn signal(&self) -> &CompletionSignal {
        &self.signal
    }

    fn lock(&self) -> MutexGuard<'_, dyn ResponseChannel + 'static> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn note_write<T>(&self, result: Result<T, ChannelError>) -> Result<T, ChannelError> {
        self.signal.resolve(Completion::Responded);
        result
    }
}

impl ResponseChannel for TrackedResponse {
    fn status(&self) -> StatusCode {
        self.lock().status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.lock().set_status(status);
    }

    fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.lock().insert_header(name, value);
    }

    fn headers_sent(&self) -> bool {
        self.lock().headers_sent()
    }

    fn send(&mut self, body: Bytes) -> Result<(), ChannelError> {
        let result = self.lock().send(body);
        self.note_write(result)
    }

    fn end(&mut self) -> Result<(), ChannelError> {
        let result = self.lock().end();
        self.note_write(result)
    }

    fn send_json(&mut self, value: &serde_json::Value) -> Result<(), ChannelError> {
        let result = self.lock().send_json(value);
        self.note_write(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::BufferedResponse;

    fn tracked() -> (TrackedResponse, Arc<Mutex<BufferedResponse>>, CompletionSignal) {
        let channel = Arc::new(Mutex::new(BufferedResponse::new()));
        let signal = CompletionSignal::new();
        let tracked = TrackedResponse::new(channel.clone(), signal.clone());
        (tracked, channel, signal)
    }

    #[test]
    fn send_resolves_completion_after_the_write() {
        let (mut tracked, channel, signal) = tracked();
        assert!(!signal.is_complete());

        tracked.set_status(StatusCode::CREATED);
        tracked.send(Bytes::from_static(b"stored")).expect("send");

        assert_eq!(signal.outcome(), Some(Completion::Responded));
        let inner = channel.lock().unwrap();
        assert_eq!(inner.status(), StatusCode::CREATED);
        assert_eq!(inner.body().as_ref(), b"stored");
    }

    #[test]
    fn repeated_terminal_writes_resolve_exactly_once() {
        let (mut tracked, _channel, signal) = tracked();

        tracked.end().expect("first end");
        let err = tracked.end().expect_err("second end rejected");
        assert!(matches!(err, ChannelError::AlreadyCompleted));
        assert_eq!(signal.outcome(), Some(Completion::Responded));
    }

    #[test]
    fn send_json_is_a_terminal_write() {
        let (mut tracked, channel, signal) = tracked();

        tracked
            .send_json(&serde_json::json!({"ok": true}))
            .expect("json");

        assert_eq!(signal.outcome(), Some(Completion::Responded));
        assert!(channel.lock().unwrap().is_completed());
    }

    #[test]
    fn failed_write_still_notifies_and_propagates_the_failure() {
        let channel = Arc::new(Mutex::new(BufferedResponse::new()));
        channel
            .lock()
            .unwrap()
            .send(Bytes::from_static(b"already out"))
            .expect("pre-complete");

        let signal = CompletionSignal::new();
        let mut tracked = TrackedResponse::new(channel.clone(), signal.clone());

        let err = tracked.send(Bytes::from_static(b"late")).expect_err("rejected");
        assert!(matches!(err, ChannelError::AlreadyCompleted));
        assert!(signal.is_complete());
        assert_eq!(channel.lock().unwrap().body().as_ref(), b"already out");
    }

    #[test]
    fn non_terminal_writes_do_not_resolve() {
        let (mut tracked, _channel, signal) = tracked();
        tracked.set_status(StatusCode::ACCEPTED);
        tracked.insert_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc123"),
        );
        assert!(!signal.is_complete());
    }

    #[test]
    fn callback_and_write_race_resolves_once() {
        use crate::signal::CompletionCallback;

        let (mut tracked, _channel, signal) = tracked();
        let callback = CompletionCallback::new(signal.clone());

        tracked.send(Bytes::from_static(b"body")).expect("send");
        assert!(!callback.invoke(None));
        assert_eq!(signal.outcome(), Some(Completion::Responded));
    }
}
