use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::signal;
use tower::{service_fn, Service};

use fnrelay_gateway::gateway::Gateway;

use crate::service::FnRelayAxumService;

/// Configuration for the local server embedding the gateway into Axum.
#[derive(Clone)]
pub struct RelayDevServerConfig {
    pub addr: SocketAddr,
    pub enable_ctrl_c: bool,
}

impl Default for RelayDevServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            enable_ctrl_c: true,
        }
    }
}

/// Blocking server runner for local development.
pub struct RelayDevServer {
    gateway: Arc<Gateway>,
    config: RelayDevServerConfig,
}

impl RelayDevServer {
    pub fn new(gateway: Gateway) -> Self {
        Self::with_config(gateway, RelayDevServerConfig::default())
    }

    pub fn with_config(gateway: Gateway, config: RelayDevServerConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            config,
        }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let runtime = RuntimeBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;

        runtime.block_on(async move { self.run_async().await })
    }

    async fn run_async(self) -> anyhow::Result<()> {
        let RelayDevServer { gateway, config } = self;

        let listener = StdTcpListener::bind(config.addr)
            .with_context(|| format!("failed to bind dev server to {}", config.addr))?;
        listener
            .set_nonblocking(true)
            .context("failed to set listener to non-blocking")?;

        let listener = tokio::net::TcpListener::from_std(listener)
            .context("failed to adopt std listener into tokio")?;

        serve_with_listener(gateway, listener, config.enable_ctrl_c).await
    }

    #[cfg(test)]
    async fn run_with_listener(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        let RelayDevServer { gateway, config } = self;
        serve_with_listener(gateway, listener, config.enable_ctrl_c).await
    }
}

async fn serve_with_listener(
    gateway: Arc<Gateway>,
    listener: tokio::net::TcpListener,
    enable_ctrl_c: bool,
) -> anyhow::Result<()> {
    let service = FnRelayAxumService::from_shared(gateway);
    let router = Router::new().fallback_service(service_fn(move |req| {
        let mut svc = service.clone();
        async move { svc.call(req).await }
    }));
    let make_service = router.into_make_service();

    let shutdown = if enable_ctrl_c {
        Some(async {
            let _ = signal::ctrl_c().await;
        })
    } else {
        None
    };

    let server = axum::serve(listener, make_service);
    if let Some(shutdown) = shutdown {
        let server = server.with_graceful_shutdown(shutdown);
        server.await.context("axum server error")?;
    } else {
        server.await.context("axum server error")?;
    }

    Ok(())
}

/// Run the gateway as a local server with default logging.
pub fn run_app(gateway: Gateway) -> anyhow::Result<()> {
    SimpleLogger::new().with_level(LevelFilter::Info).init().ok();
    RelayDevServer::new(gateway).run()
}
