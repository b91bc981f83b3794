//! # compass-api — Axum API Service for Compass
//!
//! The service layer of the compliance posture stack: framework registry,
//! policy-control mapping records, the analysis orchestrator, notification
//! records, and exports of completed assessments.
//!
//! ## API Surface
//!
//! | Prefix                  | Module                     | Domain                    |
//! |-------------------------|----------------------------|---------------------------|
//! | `/v1/frameworks/*`      | [`routes::frameworks`]     | Framework registry        |
//! | `/v1/frameworks/:id/mappings`, `/v1/mappings/*` | [`routes::mappings`] | Mapping records |
//! | `/v1/analyses/*`        | [`routes::analyses`]       | Analyses and exports      |
//! | `/v1/notifications/*`   | [`routes::notifications`]  | Notification records      |
//! | `/health/*`             | here                       | Probes (no rate limit)    |
//! | `/openapi.json`         | [`openapi`]                | Generated OpenAPI spec    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - Sits at the top of the dependency DAG.
//! - No scoring logic in route handlers — the engine crate owns it, the
//!   [`orchestrator`] drives it.
//! - All errors map to structured HTTP responses via [`AppError`].

pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod orchestrator;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the rate limiter so
/// orchestration platforms can poll them freely. The analysis dispatcher is
/// NOT started here — callers run [`orchestrator::start_workers`] once a
/// runtime is available.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());

    let api = Router::new()
        .merge(routes::frameworks::router())
        .merge(routes::mappings::router())
        .merge(routes::analyses::router())
        .merge(routes::notifications::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
