//! Analysis record persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `analyses` table.
//! Records are mirrored with an upsert at each lifecycle transition; the
//! scored collections travel as JSONB.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use compass_core::{AnalysisId, FrameworkId, UserId};
use compass_engine::{AnalysisRecord, AnalysisStatus};

/// Insert or update an analysis record.
pub async fn upsert(pool: &PgPool, record: &AnalysisRecord) -> Result<(), sqlx::Error> {
    let category_scores = to_jsonb(&record.category_scores)?;
    let gaps = to_jsonb(&record.gaps)?;
    let recommendations = to_jsonb(&record.recommendations)?;
    let mapping_snapshot = to_jsonb(&record.mapping_snapshot)?;

    sqlx::query(
        "INSERT INTO analyses (id, framework_id, triggered_by, status, total_controls,
         fully_covered, partially_covered, not_covered, overall_score, category_scores,
         gaps, recommendations, mapping_snapshot, error_message, created_at, started_at,
         completed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         ON CONFLICT (id) DO UPDATE SET
             status = EXCLUDED.status,
             total_controls = EXCLUDED.total_controls,
             fully_covered = EXCLUDED.fully_covered,
             partially_covered = EXCLUDED.partially_covered,
             not_covered = EXCLUDED.not_covered,
             overall_score = EXCLUDED.overall_score,
             category_scores = EXCLUDED.category_scores,
             gaps = EXCLUDED.gaps,
             recommendations = EXCLUDED.recommendations,
             mapping_snapshot = EXCLUDED.mapping_snapshot,
             error_message = EXCLUDED.error_message,
             started_at = EXCLUDED.started_at,
             completed_at = EXCLUDED.completed_at",
    )
    .bind(record.id.as_uuid())
    .bind(record.framework_id.as_uuid())
    .bind(record.triggered_by.as_uuid())
    .bind(record.status.as_str())
    .bind(record.total_controls as i32)
    .bind(record.fully_covered as i32)
    .bind(record.partially_covered as i32)
    .bind(record.not_covered as i32)
    .bind(record.overall_score)
    .bind(category_scores)
    .bind(gaps)
    .bind(recommendations)
    .bind(mapping_snapshot)
    .bind(&record.error_message)
    .bind(record.created_at)
    .bind(record.started_at)
    .bind(record.completed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all analyses from the database into the in-memory store on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AnalysisRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AnalysisRow>(
        "SELECT id, framework_id, triggered_by, status, total_controls, fully_covered,
         partially_covered, not_covered, overall_score, category_scores, gaps,
         recommendations, mapping_snapshot, error_message, created_at, started_at,
         completed_at
         FROM analyses ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AnalysisRow::into_record).collect())
}

fn to_jsonb<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AnalysisRow {
    id: Uuid,
    framework_id: Uuid,
    triggered_by: Uuid,
    status: String,
    total_controls: i32,
    fully_covered: i32,
    partially_covered: i32,
    not_covered: i32,
    overall_score: Option<f64>,
    category_scores: serde_json::Value,
    gaps: serde_json::Value,
    recommendations: serde_json::Value,
    mapping_snapshot: serde_json::Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl AnalysisRow {
    fn into_record(self) -> AnalysisRecord {
        AnalysisRecord {
            id: AnalysisId(self.id),
            framework_id: FrameworkId(self.framework_id),
            triggered_by: UserId(self.triggered_by),
            status: AnalysisStatus::parse(&self.status),
            total_controls: self.total_controls.max(0) as u32,
            fully_covered: self.fully_covered.max(0) as u32,
            partially_covered: self.partially_covered.max(0) as u32,
            not_covered: self.not_covered.max(0) as u32,
            overall_score: self.overall_score,
            category_scores: serde_json::from_value(self.category_scores).unwrap_or_default(),
            gaps: serde_json::from_value(self.gaps).unwrap_or_default(),
            recommendations: serde_json::from_value(self.recommendations).unwrap_or_default(),
            mapping_snapshot: serde_json::from_value(self.mapping_snapshot).unwrap_or_default(),
            error_message: self.error_message,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}
