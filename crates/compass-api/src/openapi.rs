//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Compass API — Compliance Posture Assessment",
        version = "0.3.2",
        description = "Framework registry, policy-control mappings, coverage analyses with gap detection and remediation recommendations, notification records, and CSV/summary exports.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Frameworks
        crate::routes::frameworks::register_framework,
        crate::routes::frameworks::list_frameworks,
        crate::routes::frameworks::get_framework,
        crate::routes::frameworks::list_controls,
        // Mappings
        crate::routes::mappings::create_mapping,
        crate::routes::mappings::list_mappings,
        crate::routes::mappings::delete_mapping,
        // Analyses
        crate::routes::analyses::start_analysis,
        crate::routes::analyses::list_analyses,
        crate::routes::analyses::get_analysis,
        crate::routes::analyses::export_gaps_csv,
        crate::routes::analyses::export_coverage_csv,
        crate::routes::analyses::export_summary,
        // Notifications
        crate::routes::notifications::list_notifications,
    ),
    components(schemas(
        // State record types
        crate::state::FrameworkRecord,
        crate::state::MappingRecord,
        crate::state::NotificationRecord,
        crate::state::NotificationKind,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // DTOs
        crate::routes::frameworks::RegisterFrameworkRequest,
        crate::routes::frameworks::ControlView,
        crate::routes::mappings::CreateMappingRequest,
        crate::routes::analyses::StartAnalysisRequest,
    )),
    tags(
        (name = "frameworks", description = "Framework registry"),
        (name = "mappings", description = "Policy-control mapping records"),
        (name = "analyses", description = "Coverage analyses and exports"),
        (name = "notifications", description = "Notification records"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
///
/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
