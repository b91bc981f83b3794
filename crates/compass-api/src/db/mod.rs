//! # Database Persistence
//!
//! Optional Postgres mirror for the in-memory stores. Each submodule owns
//! one table and takes a `&PgPool`. The in-memory stores stay the system of
//! record; the database provides durability across restarts via
//! [`crate::state::AppState::hydrate_from_db`].

pub mod analyses;
pub mod frameworks;
pub mod mappings;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Initialize the connection pool from `DATABASE_URL`.
///
/// Returns `Ok(None)` when the variable is unset — the API then runs in
/// in-memory-only mode. A set-but-unreachable database is an error; better
/// to fail startup than to silently drop durability.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::info!("DATABASE_URL not set — running in in-memory-only mode");
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await?;
    tracing::info!("database pool initialized");
    Ok(Some(pool))
}

/// Create the tables this service owns, when they don't exist yet.
///
/// Deployments with managed migrations run those instead; this keeps a
/// fresh database usable out of the box.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS frameworks (
            id UUID PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            version TEXT NOT NULL,
            control_count INTEGER NOT NULL,
            definition JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS mappings (
            id UUID PRIMARY KEY,
            framework_id UUID NOT NULL,
            policy_id UUID NOT NULL,
            control_id UUID NOT NULL,
            coverage_level TEXT NOT NULL,
            verification TEXT NOT NULL,
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS analyses (
            id UUID PRIMARY KEY,
            framework_id UUID NOT NULL,
            triggered_by UUID NOT NULL,
            status TEXT NOT NULL,
            total_controls INTEGER NOT NULL,
            fully_covered INTEGER NOT NULL,
            partially_covered INTEGER NOT NULL,
            not_covered INTEGER NOT NULL,
            overall_score DOUBLE PRECISION,
            category_scores JSONB NOT NULL,
            gaps JSONB NOT NULL,
            recommendations JSONB NOT NULL,
            mapping_snapshot JSONB NOT NULL,
            error_message TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
