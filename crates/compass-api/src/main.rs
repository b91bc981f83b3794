//! # compass-api — Binary Entry Point
//!
//! Starts the Axum HTTP server and the analysis dispatcher. Binds to a
//! configurable port (default 8080).

use compass_api::state::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let analysis_concurrency: usize = std::env::var("ANALYSIS_WORKERS")
        .ok()
        .and_then(|w| w.parse().ok())
        .unwrap_or(4);
    let config = AppConfig {
        port,
        analysis_concurrency,
    };

    // Initialize database pool (optional — absent means in-memory only).
    let db_pool = compass_api::db::init_pool().await.map_err(|e| {
        tracing::error!("database initialization failed: {e}");
        e
    })?;
    if let Some(pool) = &db_pool {
        compass_api::db::ensure_schema(pool).await.map_err(|e| {
            tracing::error!("schema bootstrap failed: {e}");
            e
        })?;
    }

    let state = compass_api::AppState::with_config(config, db_pool);

    // Hydrate in-memory stores from database (if connected).
    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("database hydration failed: {e}");
        e
    })?;

    // Start the analysis dispatcher before accepting traffic.
    compass_api::orchestrator::start_workers(state.clone());

    let app = compass_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Compass API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
