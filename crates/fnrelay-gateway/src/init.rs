use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use fnrelay_core::dispatch::SharedDispatcher;

type InitFuture = Pin<Box<dyn Future<Output = Result<SharedDispatcher, anyhow::Error>> + Send>>;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("no dispatcher initialization strategies configured")]
    NoStrategies,
    #[error("all {attempts} dispatcher initialization strategies failed: {detail}")]
    Exhausted { attempts: usize, detail: String },
}

/// One way of constructing the dispatcher, tried as part of an ordered list.
pub struct InitStrategy {
    name: String,
    factory: Box<dyn Fn() -> InitFuture + Send + Sync>,
}

impl InitStrategy {
    pub fn new<S, F, Fut>(name: S, factory: F) -> Self
    where
        S: Into<String>,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SharedDispatcher, anyhow::Error>> + Send + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(move || -> InitFuture { Box::pin(factory()) }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<SharedDispatcher, anyhow::Error> {
        (self.factory)().await
    }
}

/// Ordered list of initialization strategies, tried in sequence and
/// short-circuiting on the first success. Failures are reported as values,
/// never unwound through the caller.
#[derive(Default)]
pub struct DispatcherLoader {
    strategies: Vec<InitStrategy>,
}

impl DispatcherLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-strategy loader around an already-constructed dispatcher.
    pub fn from_instance(dispatcher: SharedDispatcher) -> Self {
        Self::new().with("instance", move || {
            let dispatcher = dispatcher.clone();
            async move { Ok(dispatcher) }
        })
    }

    pub fn strategy(mut self, strategy: InitStrategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn with<S, F, Fut>(self, name: S, factory: F) -> Self
    where
        S: Into<String>,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SharedDispatcher, anyhow::Error>> + Send + 'static,
    {
        self.strategy(InitStrategy::new(name, factory))
    }

    pub async fn load(&self) -> Result<SharedDispatcher, InitError> {
        if self.strategies.is_empty() {
            return Err(InitError::NoStrategies);
        }

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.run().await {
                Ok(dispatcher) => {
                    tracing::debug!(strategy = strategy.name(), "dispatcher initialized");
                    return Ok(dispatcher);
                }
                Err(err) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        error = %err,
                        "dispatcher initialization strategy failed"
                    );
                    failures.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }

        Err(InitError::Exhausted {
            attempts: failures.len(),
            detail: failures.join("; "),
        })
    }
}
