//! Adapts serverless platform function invocations to an embedded dispatcher:
//! path reconstruction, request translation, completion tracking, and the
//! fallback/timeout guard.

pub mod config;
pub mod gateway;
pub mod init;
pub mod path;
pub mod translate;
