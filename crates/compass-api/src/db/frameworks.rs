//! Framework persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `frameworks` table.
//! The definition is stored as JSONB; the frozen model is rebuilt from it
//! on load.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use compass_core::{FrameworkDefinition, FrameworkId};

use crate::state::FrameworkRecord;

/// Insert a new framework record.
pub async fn insert(pool: &PgPool, record: &FrameworkRecord) -> Result<(), sqlx::Error> {
    let definition = serde_json::to_value(&record.definition)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        "INSERT INTO frameworks (id, code, name, version, control_count, definition, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(record.id.as_uuid())
    .bind(&record.code)
    .bind(&record.name)
    .bind(&record.version)
    .bind(record.control_count as i32)
    .bind(definition)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all frameworks from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<FrameworkRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FrameworkRow>(
        "SELECT id, code, name, version, control_count, definition, created_at
         FROM frameworks ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(FrameworkRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct FrameworkRow {
    id: Uuid,
    code: String,
    name: String,
    version: String,
    control_count: i32,
    definition: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl FrameworkRow {
    fn into_record(self) -> FrameworkRecord {
        let definition: FrameworkDefinition = serde_json::from_value(self.definition)
            .unwrap_or(FrameworkDefinition {
                code: self.code.clone(),
                name: self.name.clone(),
                version: self.version.clone(),
                categories: Vec::new(),
            });
        FrameworkRecord {
            id: FrameworkId(self.id),
            code: self.code,
            name: self.name,
            version: self.version,
            control_count: self.control_count.max(0) as u32,
            definition,
            created_at: self.created_at,
        }
    }
}
