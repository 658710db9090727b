use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

use crate::dispatch::DispatchError;

/// How a request activation finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The dispatcher wrote a response through the tracked channel.
    Responded,
    /// The dispatcher called back without an error and without responding,
    /// i.e. no route matched.
    Unhandled,
    /// The dispatcher reported an error.
    Failed(String),
    /// Nothing completed within the guard's timeout window.
    TimedOut,
}

/// One-shot completion flag shared between the tracked response, the
/// dispatcher callback, and the guard awaiting the outcome.
///
/// The PENDING → COMPLETED transition fires exactly once; every later
/// `resolve` is a no-op. The dispatcher's own callback semantics and the
/// response channel's write semantics both feed this single signal.
#[derive(Clone, Default)]
pub struct CompletionSignal {
    inner: Arc<SignalInner>,
}

#[derive(Default)]
struct SignalInner {
    state: Mutex<SignalState>,
}

#[derive(Default)]
struct SignalState {
    outcome: Option<Completion>,
    wakers: Vec<Waker>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt the PENDING → COMPLETED transition. Returns `false` when the
    /// signal had already resolved; the earlier outcome stands.
    pub fn resolve(&self, outcome: Completion) -> bool {
        let mut state = self.lock();
        if state.outcome.is_some() {
            tracing::trace!(?outcome, "completion already resolved, ignoring");
            return false;
        }
        state.outcome = Some(outcome);
        for waker in state.wakers.drain(..) {
            waker.wake();
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.lock().outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Completion> {
        self.lock().outcome.clone()
    }

    /// Future resolving with the final outcome.
    pub fn wait(&self) -> CompletionFuture {
        CompletionFuture {
            inner: Arc::clone(&self.inner),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SignalState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct CompletionFuture {
    inner: Arc<SignalInner>,
}

impl Future for CompletionFuture {
    type Output = Completion;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(outcome) = state.outcome.clone() {
            return Poll::Ready(outcome);
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

/// Callback handed to the dispatcher, mirroring the `done(error?)` contract:
/// invoking it without an error signals "no matching route", invoking it with
/// one reports a dispatch failure. Both lose against an earlier resolution.
#[derive(Clone)]
pub struct CompletionCallback {
    signal: CompletionSignal,
}

impl CompletionCallback {
    pub fn new(signal: CompletionSignal) -> Self {
        Self { signal }
    }

    /// Returns whether this invocation resolved the signal.
    pub fn invoke(&self, error: Option<DispatchError>) -> bool {
        match error {
            Some(err) => self
                .signal
                .resolve(Completion::Failed(err.message().to_string())),
            None => self.signal.resolve(Completion::Unhandled),
        }
    }
}
