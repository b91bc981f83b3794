//! # Framework Registry API
//!
//! Handles framework registration and read access to the control taxonomy.
//! Frameworks are immutable once registered — corrections are a new
//! registration, not an edit — which is what lets analysis snapshots
//! reference them without version skew.
//!
//! ## Endpoints
//!
//! - `POST /v1/frameworks` — register a framework definition
//! - `GET /v1/frameworks` — list registered frameworks
//! - `GET /v1/frameworks/:id` — get one framework
//! - `GET /v1/frameworks/:id/controls` — flat control listing with ids

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use compass_core::{CategoryDefinition, Framework, FrameworkDefinition, FrameworkId};

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, FrameworkRecord};

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to register a new framework.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterFrameworkRequest {
    /// Short reference code (e.g. "SOC2").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Version label of the standard.
    pub version: String,
    /// The category/control taxonomy.
    #[schema(value_type = Vec<Object>)]
    pub categories: Vec<CategoryDefinition>,
}

impl Validate for RegisterFrameworkRequest {
    fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.version.trim().is_empty() {
            return Err("version must not be empty".to_string());
        }
        Ok(())
    }
}

impl RegisterFrameworkRequest {
    fn into_definition(self) -> FrameworkDefinition {
        FrameworkDefinition {
            code: self.code,
            name: self.name,
            version: self.version,
            categories: self.categories,
        }
    }
}

/// One control in the flat listing, with its derived identifier.
#[derive(Debug, Serialize, ToSchema)]
pub struct ControlView {
    /// Derived stable control identifier; mappings reference this.
    pub id: Uuid,
    /// Control reference code.
    pub code: String,
    /// Requirement title.
    pub title: String,
    /// Requirement text.
    pub description: String,
    /// Code of the owning category.
    pub category_code: String,
    /// Whether the owning category escalates uncovered controls.
    pub category_high_priority: bool,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the frameworks router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/frameworks",
            get(list_frameworks).post(register_framework),
        )
        .route("/v1/frameworks/:id", get(get_framework))
        .route("/v1/frameworks/:id/controls", get(list_controls))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/frameworks — Register a framework definition.
#[utoipa::path(
    post,
    path = "/v1/frameworks",
    request_body = RegisterFrameworkRequest,
    responses(
        (status = 201, description = "Framework registered", body = FrameworkRecord),
        (status = 422, description = "Definition rejected", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn register_framework(
    State(state): State<AppState>,
    body: Result<Json<RegisterFrameworkRequest>, JsonRejection>,
) -> Result<(axum::http::StatusCode, Json<FrameworkRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let definition = req.into_definition();

    let id = FrameworkId::new();
    // Building the model is the structural validation: duplicate codes,
    // unknown parents, and cycles are rejected here.
    let model = Framework::from_definition(id, &definition)?;

    let record = FrameworkRecord {
        id,
        code: definition.code.clone(),
        name: definition.name.clone(),
        version: definition.version.clone(),
        control_count: model.control_count() as u32,
        definition,
        created_at: Utc::now(),
    };

    state.frameworks.insert(id, record.clone());
    if let Some(pool) = &state.db_pool {
        if let Err(err) = crate::db::frameworks::insert(pool, &record).await {
            tracing::warn!(framework = %id, error = %err, "framework mirror write failed");
        }
    }

    Ok((axum::http::StatusCode::CREATED, Json(record)))
}

/// GET /v1/frameworks — List registered frameworks.
#[utoipa::path(
    get,
    path = "/v1/frameworks",
    responses(
        (status = 200, description = "Registered frameworks", body = Vec<FrameworkRecord>),
    ),
    tag = "frameworks"
)]
pub async fn list_frameworks(State(state): State<AppState>) -> Json<Vec<FrameworkRecord>> {
    let mut records = state.frameworks.list();
    records.sort_by(|a, b| a.code.cmp(&b.code));
    Json(records)
}

/// GET /v1/frameworks/:id — Get a single framework.
#[utoipa::path(
    get,
    path = "/v1/frameworks/{id}",
    params(("id" = Uuid, Path, description = "Framework ID")),
    responses(
        (status = 200, description = "Framework found", body = FrameworkRecord),
        (status = 404, description = "Framework not found", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn get_framework(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FrameworkRecord>, AppError> {
    state
        .frameworks
        .get(&FrameworkId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("framework {id} not found")))
}

/// GET /v1/frameworks/:id/controls — Flat control listing.
#[utoipa::path(
    get,
    path = "/v1/frameworks/{id}/controls",
    params(("id" = Uuid, Path, description = "Framework ID")),
    responses(
        (status = 200, description = "Controls in taxonomy order", body = Vec<ControlView>),
        (status = 404, description = "Framework not found", body = crate::error::ErrorBody),
    ),
    tag = "frameworks"
)]
pub async fn list_controls(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ControlView>>, AppError> {
    let record = state
        .frameworks
        .get(&FrameworkId(id))
        .ok_or_else(|| AppError::NotFound(format!("framework {id} not found")))?;
    let model = record
        .model()
        .map_err(|err| AppError::Internal(format!("stored framework failed to load: {err}")))?;

    let controls = model
        .controls()
        .filter_map(|control| {
            // The control index is consistent by construction; filter_map
            // keeps this handler panic-free regardless.
            let category = model.category_of(control.id)?;
            Some(ControlView {
                id: *control.id.as_uuid(),
                code: control.code.clone(),
                title: control.title.clone(),
                description: control.description.clone(),
                category_code: category.code.clone(),
                category_high_priority: category.high_priority,
            })
        })
        .collect();

    Ok(Json(controls))
}
