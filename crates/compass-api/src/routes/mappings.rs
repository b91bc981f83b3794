//! # Policy-Control Mapping API
//!
//! Records which organizational policies address which framework controls.
//! These records are the raw material of every coverage analysis; the
//! engine reads them as a point-in-time snapshot.
//!
//! ## Endpoints
//!
//! - `POST /v1/frameworks/:id/mappings` — record a mapping
//! - `GET /v1/frameworks/:id/mappings` — list mappings for a framework
//! - `DELETE /v1/mappings/:id` — remove a mapping

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use compass_core::{ControlId, CoverageLevel, FrameworkId, MappingId, PolicyId, VerificationState};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, MappingRecord};

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to record a policy-control mapping.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMappingRequest {
    /// The policy addressing the control.
    pub policy_id: Uuid,
    /// The control being addressed (see `GET /v1/frameworks/:id/controls`).
    pub control_id: Uuid,
    /// How well the policy covers the control.
    #[schema(value_type = String, example = "partial")]
    pub coverage_level: CoverageLevel,
    /// Whether a reviewer has confirmed the mapping.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub verification: Option<VerificationState>,
    /// Free-form reviewer notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for CreateMappingRequest {
    fn validate(&self) -> Result<(), String> {
        if self.policy_id.is_nil() {
            return Err("policy_id must not be the nil UUID".to_string());
        }
        if self.control_id.is_nil() {
            return Err("control_id must not be the nil UUID".to_string());
        }
        if let Some(notes) = &self.notes {
            if notes.len() > 2000 {
                return Err("notes must not exceed 2000 characters".to_string());
            }
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the mappings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/frameworks/:id/mappings",
            get(list_mappings).post(create_mapping),
        )
        .route("/v1/mappings/:id", delete(delete_mapping))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/frameworks/:id/mappings — Record a mapping.
#[utoipa::path(
    post,
    path = "/v1/frameworks/{id}/mappings",
    params(("id" = Uuid, Path, description = "Framework ID")),
    request_body = CreateMappingRequest,
    responses(
        (status = 201, description = "Mapping recorded", body = MappingRecord),
        (status = 404, description = "Framework not found", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown control or invalid fields", body = crate::error::ErrorBody),
    ),
    tag = "mappings"
)]
pub async fn create_mapping(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<CreateMappingRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<MappingRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let framework_id = FrameworkId(id);

    let framework = state
        .frameworks
        .get(&framework_id)
        .ok_or_else(|| AppError::NotFound(format!("framework {id} not found")))?;
    let model = framework
        .model()
        .map_err(|err| AppError::Internal(format!("stored framework failed to load: {err}")))?;

    let control_id = ControlId(req.control_id);
    if model.control(control_id).is_none() {
        return Err(AppError::Validation(format!(
            "control {} does not belong to framework {}",
            req.control_id, framework.code
        )));
    }

    let record = MappingRecord {
        id: MappingId::new(),
        framework_id,
        policy_id: PolicyId(req.policy_id),
        control_id,
        coverage_level: req.coverage_level,
        verification: req.verification.unwrap_or_default(),
        notes: req.notes,
        created_at: Utc::now(),
    };

    state.mappings.insert(record.id, record.clone());
    if let Some(pool) = &state.db_pool {
        if let Err(err) = crate::db::mappings::insert(pool, &record).await {
            tracing::warn!(mapping = %record.id, error = %err, "mapping mirror write failed");
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/frameworks/:id/mappings — List mappings for a framework.
#[utoipa::path(
    get,
    path = "/v1/frameworks/{id}/mappings",
    params(("id" = Uuid, Path, description = "Framework ID")),
    responses(
        (status = 200, description = "Mappings for the framework", body = Vec<MappingRecord>),
        (status = 404, description = "Framework not found", body = crate::error::ErrorBody),
    ),
    tag = "mappings"
)]
pub async fn list_mappings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MappingRecord>>, AppError> {
    let framework_id = FrameworkId(id);
    if !state.frameworks.contains(&framework_id) {
        return Err(AppError::NotFound(format!("framework {id} not found")));
    }

    let mut records: Vec<MappingRecord> = state
        .mappings
        .list()
        .into_iter()
        .filter(|m| m.framework_id == framework_id)
        .collect();
    records.sort_by(|a, b| (a.created_at, a.id.0).cmp(&(b.created_at, b.id.0)));
    Ok(Json(records))
}

/// DELETE /v1/mappings/:id — Remove a mapping.
#[utoipa::path(
    delete,
    path = "/v1/mappings/{id}",
    params(("id" = Uuid, Path, description = "Mapping ID")),
    responses(
        (status = 204, description = "Mapping removed"),
        (status = 404, description = "Mapping not found", body = crate::error::ErrorBody),
    ),
    tag = "mappings"
)]
pub async fn delete_mapping(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, AppError> {
    let mapping_id = MappingId(id);
    state
        .mappings
        .remove(&mapping_id)
        .ok_or_else(|| AppError::NotFound(format!("mapping {id} not found")))?;

    if let Some(pool) = &state.db_pool {
        if let Err(err) = crate::db::mappings::delete(pool, mapping_id).await {
            tracing::warn!(mapping = %mapping_id, error = %err, "mapping mirror delete failed");
        }
    }

    Ok(axum::http::StatusCode::NO_CONTENT)
}
