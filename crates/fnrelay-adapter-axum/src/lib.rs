//! Axum adapter: runs the FnRelay gateway behind a local Hyper server, playing
//! the role the serverless platform plays in production.

mod dev_server;
mod request;
mod response;
mod service;

pub use dev_server::{run_app, RelayDevServer, RelayDevServerConfig};
pub use request::into_platform_request;
pub use response::into_axum_response;
pub use service::FnRelayAxumService;
