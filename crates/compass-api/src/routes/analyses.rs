//! # Analysis API
//!
//! Triggers coverage analyses and serves their records and exports.
//!
//! The trigger endpoint returns the `pending` record synchronously and
//! never waits on computation — the orchestrator drives the job to a
//! terminal state on its own schedule. Exports only exist for `completed`
//! records; anything else is a 409.
//!
//! ## Endpoints
//!
//! - `POST /v1/analyses` — start an analysis (returns the pending record)
//! - `GET /v1/analyses` — list analyses, newest first
//! - `GET /v1/analyses/:id` — get one analysis
//! - `GET /v1/analyses/:id/export/gaps.csv` — gap list CSV
//! - `GET /v1/analyses/:id/export/coverage.csv` — per-category CSV
//! - `GET /v1/analyses/:id/export/summary` — plain-text summary

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use compass_core::{AnalysisId, FrameworkId, UserId};
use compass_engine::AnalysisRecord;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::orchestrator::AnalysisJob;
use crate::state::AppState;

// ── Request DTOs ────────────────────────────────────────────────────

/// Request to start an analysis run.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartAnalysisRequest {
    /// The framework to assess.
    pub framework_id: Uuid,
    /// The user triggering the run (notified on terminal status).
    pub triggered_by: Uuid,
}

impl Validate for StartAnalysisRequest {
    fn validate(&self) -> Result<(), String> {
        if self.framework_id.is_nil() {
            return Err("framework_id must not be the nil UUID".to_string());
        }
        if self.triggered_by.is_nil() {
            return Err("triggered_by must not be the nil UUID".to_string());
        }
        Ok(())
    }
}

/// Query parameters for listing analyses.
#[derive(Debug, Deserialize)]
pub struct ListAnalysesParams {
    /// Restrict the listing to one framework.
    pub framework_id: Option<Uuid>,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the analyses router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/analyses", get(list_analyses).post(start_analysis))
        .route("/v1/analyses/:id", get(get_analysis))
        .route("/v1/analyses/:id/export/gaps.csv", get(export_gaps_csv))
        .route(
            "/v1/analyses/:id/export/coverage.csv",
            get(export_coverage_csv),
        )
        .route("/v1/analyses/:id/export/summary", get(export_summary))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /v1/analyses — Start an analysis.
///
/// Inserts the record in `pending` and submits the job; the response never
/// waits on computation.
#[utoipa::path(
    post,
    path = "/v1/analyses",
    request_body = StartAnalysisRequest,
    responses(
        (status = 201, description = "Analysis created in pending state", body = Object),
        (status = 404, description = "Framework not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid identifiers", body = crate::error::ErrorBody),
    ),
    tag = "analyses"
)]
pub async fn start_analysis(
    State(state): State<AppState>,
    body: Result<Json<StartAnalysisRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AnalysisRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let framework_id = FrameworkId(req.framework_id);

    if !state.frameworks.contains(&framework_id) {
        return Err(AppError::NotFound(format!(
            "framework {} not found",
            req.framework_id
        )));
    }
    if !state.analysis_queue.is_running() {
        return Err(AppError::Internal(
            "analysis queue is not running".to_string(),
        ));
    }

    let record = AnalysisRecord::new_pending(framework_id, UserId(req.triggered_by));
    let analysis_id = record.id;
    state.analyses.insert(analysis_id, record.clone());

    if let Some(pool) = &state.db_pool {
        if let Err(err) = crate::db::analyses::upsert(pool, &record).await {
            tracing::warn!(analysis = %analysis_id, error = %err, "analysis mirror write failed");
        }
    }

    if let Err(err) = state.analysis_queue.submit(AnalysisJob { analysis_id }) {
        // The record never became visible work; withdraw it rather than
        // leave a pending row no worker will ever touch.
        state.analyses.remove(&analysis_id);
        return Err(AppError::Internal(format!(
            "failed to enqueue analysis: {err}"
        )));
    }

    tracing::info!(analysis = %analysis_id, framework = %framework_id, "analysis queued");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/analyses — List analyses, newest first.
#[utoipa::path(
    get,
    path = "/v1/analyses",
    params(("framework_id" = Option<Uuid>, Query, description = "Restrict to one framework")),
    responses(
        (status = 200, description = "Analyses, newest first", body = Vec<Object>),
    ),
    tag = "analyses"
)]
pub async fn list_analyses(
    State(state): State<AppState>,
    Query(params): Query<ListAnalysesParams>,
) -> Json<Vec<AnalysisRecord>> {
    let mut records: Vec<AnalysisRecord> = state
        .analyses
        .list()
        .into_iter()
        .filter(|record| match params.framework_id {
            Some(framework_id) => record.framework_id == FrameworkId(framework_id),
            None => true,
        })
        .collect();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.0.cmp(&a.id.0)));
    Json(records)
}

/// GET /v1/analyses/:id — Get a single analysis.
#[utoipa::path(
    get,
    path = "/v1/analyses/{id}",
    params(("id" = Uuid, Path, description = "Analysis ID")),
    responses(
        (status = 200, description = "Analysis found", body = Object),
        (status = 404, description = "Analysis not found", body = crate::error::ErrorBody),
    ),
    tag = "analyses"
)]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisRecord>, AppError> {
    state
        .analyses
        .get(&AnalysisId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("analysis {id} not found")))
}

/// GET /v1/analyses/:id/export/gaps.csv — Export the gap list as CSV.
#[utoipa::path(
    get,
    path = "/v1/analyses/{id}/export/gaps.csv",
    params(("id" = Uuid, Path, description = "Analysis ID")),
    responses(
        (status = 200, description = "Gap list CSV", content_type = "text/csv"),
        (status = 404, description = "Analysis not found", body = crate::error::ErrorBody),
        (status = 409, description = "Analysis not completed", body = crate::error::ErrorBody),
    ),
    tag = "analyses"
)]
pub async fn export_gaps_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = lookup(&state, id)?;
    let csv = compass_report::gaps_csv(&record)?;
    Ok(csv_response(csv, &format!("gaps-{id}.csv")))
}

/// GET /v1/analyses/:id/export/coverage.csv — Export category coverage as CSV.
#[utoipa::path(
    get,
    path = "/v1/analyses/{id}/export/coverage.csv",
    params(("id" = Uuid, Path, description = "Analysis ID")),
    responses(
        (status = 200, description = "Coverage CSV", content_type = "text/csv"),
        (status = 404, description = "Analysis not found", body = crate::error::ErrorBody),
        (status = 409, description = "Analysis not completed", body = crate::error::ErrorBody),
    ),
    tag = "analyses"
)]
pub async fn export_coverage_csv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = lookup(&state, id)?;
    let csv = compass_report::coverage_csv(&record)?;
    Ok(csv_response(csv, &format!("coverage-{id}.csv")))
}

/// GET /v1/analyses/:id/export/summary — Plain-text assessment summary.
#[utoipa::path(
    get,
    path = "/v1/analyses/{id}/export/summary",
    params(("id" = Uuid, Path, description = "Analysis ID")),
    responses(
        (status = 200, description = "Plain-text summary", content_type = "text/plain"),
        (status = 404, description = "Analysis not found", body = crate::error::ErrorBody),
        (status = 409, description = "Analysis not completed", body = crate::error::ErrorBody),
    ),
    tag = "analyses"
)]
pub async fn export_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = lookup(&state, id)?;
    let text = compass_report::text_summary(&record)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response())
}

fn lookup(state: &AppState, id: Uuid) -> Result<AnalysisRecord, AppError> {
    state
        .analyses
        .get(&AnalysisId(id))
        .ok_or_else(|| AppError::NotFound(format!("analysis {id} not found")))
}

fn csv_response(csv: String, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response()
}
