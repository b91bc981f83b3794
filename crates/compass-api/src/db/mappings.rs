//! Policy-control mapping persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `mappings` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use compass_core::{
    ControlId, CoverageLevel, FrameworkId, MappingId, PolicyId, VerificationState,
};

use crate::state::MappingRecord;

/// Insert a new mapping record.
pub async fn insert(pool: &PgPool, record: &MappingRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO mappings (id, framework_id, policy_id, control_id, coverage_level,
         verification, notes, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.id.as_uuid())
    .bind(record.framework_id.as_uuid())
    .bind(record.policy_id.as_uuid())
    .bind(record.control_id.as_uuid())
    .bind(record.coverage_level.as_str())
    .bind(record.verification.as_str())
    .bind(&record.notes)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a mapping record. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, id: MappingId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM mappings WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all mappings from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<MappingRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MappingRow>(
        "SELECT id, framework_id, policy_id, control_id, coverage_level,
         verification, notes, created_at
         FROM mappings ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(MappingRow::into_record).collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct MappingRow {
    id: Uuid,
    framework_id: Uuid,
    policy_id: Uuid,
    control_id: Uuid,
    coverage_level: String,
    verification: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl MappingRow {
    fn into_record(self) -> MappingRecord {
        MappingRecord {
            id: MappingId(self.id),
            framework_id: FrameworkId(self.framework_id),
            policy_id: PolicyId(self.policy_id),
            control_id: ControlId(self.control_id),
            coverage_level: CoverageLevel::parse(&self.coverage_level),
            verification: match self.verification.as_str() {
                "verified" => VerificationState::Verified,
                _ => VerificationState::Unverified,
            },
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}
