//! # HTTP Middleware
//!
//! Request-level concerns shared by every route: request/error counters and
//! per-client rate limiting. Tracing comes from `tower_http::TraceLayer` in
//! the application assembly.

pub mod metrics;
pub mod rate_limit;
