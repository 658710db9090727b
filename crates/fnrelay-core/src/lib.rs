//! Core primitives for relaying serverless platform requests to an embedded dispatcher.

pub mod body;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod inbound;
pub mod signal;
pub mod track;
