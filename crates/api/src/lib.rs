//! HTTP API: configuration, cross-origin policy, authentication, and the
//! gated hospital routes.

pub mod app;
pub mod config;
pub mod cors;
pub mod middleware;
