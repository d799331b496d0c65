//! HTTP API: configuration, authentication middleware, rate limiting,
//! routing and request/response mapping.

pub mod app;
pub mod authz;
pub mod config;
pub mod middleware;
pub mod rate_limit;
