//! # Integration Tests for compass-api
//!
//! Drives the full flow through the HTTP surface: register a framework,
//! record mappings, trigger an analysis, poll it to completion, and pull
//! the exports. Also covers the synchronous rejection paths and the
//! export guard for non-completed records.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use compass_api::orchestrator::start_workers;
use compass_api::state::AppState;

/// Helper: application state plus its assembled router, dispatcher running.
fn test_app() -> (AppState, axum::Router) {
    let state = AppState::new();
    start_workers(state.clone());
    let app = compass_api::app(state.clone());
    (state, app)
}

/// Helper: read a JSON response body.
async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Helper: read a response body as a string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// The two-category framework from the acceptance scenario: A1/A2 under a
/// high-priority category, B1 under an ordinary one.
fn scenario_framework() -> Value {
    json!({
        "code": "SCEN",
        "name": "Scenario Framework",
        "version": "1",
        "categories": [
            {
                "code": "A",
                "name": "Access Control",
                "sort_order": 1,
                "high_priority": true,
                "controls": [
                    {"code": "A1", "title": "Account provisioning", "sort_order": 1},
                    {"code": "A2", "title": "Session timeout", "sort_order": 2}
                ]
            },
            {
                "code": "B",
                "name": "Business Continuity",
                "sort_order": 2,
                "controls": [
                    {"code": "B1", "title": "Backup restoration", "sort_order": 1}
                ]
            }
        ]
    })
}

/// Register the scenario framework and return (framework_id, control_views).
async fn register_scenario(app: &axum::Router) -> (String, Vec<Value>) {
    let response = app
        .clone()
        .oneshot(post("/v1/frameworks", scenario_framework()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let framework = body_json(response).await;
    let framework_id = framework["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/v1/frameworks/{framework_id}/controls")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let controls = body_json(response).await.as_array().unwrap().clone();
    (framework_id, controls)
}

/// Record a mapping for the control with the given code.
async fn map_control(
    app: &axum::Router,
    framework_id: &str,
    controls: &[Value],
    code: &str,
    level: &str,
) {
    let control = controls
        .iter()
        .find(|c| c["code"] == code)
        .unwrap_or_else(|| panic!("control {code} missing from listing"));
    let response = app
        .clone()
        .oneshot(post(
            &format!("/v1/frameworks/{framework_id}/mappings"),
            json!({
                "policy_id": uuid::Uuid::new_v4(),
                "control_id": control["id"],
                "coverage_level": level
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Poll an analysis until it reaches a terminal state.
async fn poll_terminal(app: &axum::Router, analysis_id: &str) -> Value {
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(get(&format!("/v1/analyses/{analysis_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let record = body_json(response).await;
        match record["status"].as_str().unwrap() {
            "completed" | "failed" => return record,
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    panic!("analysis {analysis_id} never reached a terminal state");
}

// -- Full flow ----------------------------------------------------------------

#[tokio::test]
async fn register_map_analyze_export_flow() {
    let (_state, app) = test_app();
    let (framework_id, controls) = register_scenario(&app).await;

    // A1 full, A2 unmapped, B1 partial.
    map_control(&app, &framework_id, &controls, "A1", "full").await;
    map_control(&app, &framework_id, &controls, "B1", "partial").await;

    let triggered_by = uuid::Uuid::new_v4();
    let response = app
        .clone()
        .oneshot(post(
            "/v1/analyses",
            json!({"framework_id": framework_id, "triggered_by": triggered_by}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let pending = body_json(response).await;
    assert_eq!(pending["status"], "pending");
    assert_eq!(pending["overall_score"], Value::Null);
    let analysis_id = pending["id"].as_str().unwrap().to_string();

    let record = poll_terminal(&app, &analysis_id).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["overall_score"], 50.0);
    assert_eq!(record["total_controls"], 3);
    assert_eq!(record["fully_covered"], 1);
    assert_eq!(record["partially_covered"], 1);
    assert_eq!(record["not_covered"], 1);

    // A2 is uncovered in a high-priority category: critical, first. B1 is
    // partially covered: medium, second.
    let gaps = record["gaps"].as_array().unwrap();
    assert_eq!(gaps.len(), 2);
    assert_eq!(gaps[0]["control_code"], "A2");
    assert_eq!(gaps[0]["severity"], "critical");
    assert_eq!(gaps[1]["control_code"], "B1");
    assert_eq!(gaps[1]["severity"], "medium");

    let recommendations = record["recommendations"].as_array().unwrap();
    assert!(!recommendations.is_empty());
    assert_eq!(recommendations[0]["priority"], 1);
    assert_eq!(recommendations[0]["timeframe"], "immediate");

    // The snapshot froze both mappings.
    assert_eq!(record["mapping_snapshot"].as_array().unwrap().len(), 2);

    // Exports.
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/analyses/{analysis_id}/export/gaps.csv")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csv = body_string(response).await;
    assert!(csv.starts_with("control_code,"));
    assert!(csv.contains("A2,"));

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/v1/analyses/{analysis_id}/export/coverage.csv"
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csv = body_string(response).await;
    assert!(csv.contains("A,Access Control,2,1,0,1,50.0"));
    assert!(csv.contains("B,Business Continuity,1,0,1,0,50.0"));

    let response = app
        .clone()
        .oneshot(get(&format!("/v1/analyses/{analysis_id}/export/summary")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_string(response).await;
    assert!(text.contains("Overall score: 50.0 / 100"));

    // The triggering user was notified of completion.
    let response = app
        .clone()
        .oneshot(get(&format!("/v1/notifications/{triggered_by}")))
        .await
        .unwrap();
    let notifications = body_json(response).await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["kind"], "analysis_completed");
}

#[tokio::test]
async fn empty_framework_analysis_fails_with_inspectable_record() {
    let (_state, app) = test_app();
    let response = app
        .clone()
        .oneshot(post(
            "/v1/frameworks",
            json!({
                "code": "EMPTY",
                "name": "Empty Framework",
                "version": "1",
                "categories": [
                    {"code": "A", "name": "Hollow", "sort_order": 1, "controls": []}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let framework_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post(
            "/v1/analyses",
            json!({
                "framework_id": framework_id,
                "triggered_by": uuid::Uuid::new_v4()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let analysis_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let record = poll_terminal(&app, &analysis_id).await;
    assert_eq!(record["status"], "failed");
    assert!(record["error_message"]
        .as_str()
        .unwrap()
        .contains("no controls"));
    assert_eq!(record["overall_score"], Value::Null);
}

// -- Synchronous rejections ---------------------------------------------------

#[tokio::test]
async fn start_analysis_unknown_framework_is_404() {
    let (_state, app) = test_app();
    let response = app
        .oneshot(post(
            "/v1/analyses",
            json!({
                "framework_id": uuid::Uuid::new_v4(),
                "triggered_by": uuid::Uuid::new_v4()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn start_analysis_nil_identifiers_are_422_and_create_nothing() {
    let (state, app) = test_app();
    let response = app
        .oneshot(post(
            "/v1/analyses",
            json!({
                "framework_id": uuid::Uuid::nil(),
                "triggered_by": uuid::Uuid::new_v4()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(state.analyses.is_empty());
}

#[tokio::test]
async fn start_analysis_malformed_body_is_400() {
    let (_state, app) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/analyses")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_framework_with_cycle_is_422() {
    let (_state, app) = test_app();
    let response = app
        .oneshot(post(
            "/v1/frameworks",
            json!({
                "code": "CYC",
                "name": "Cyclic",
                "version": "1",
                "categories": [
                    {"code": "A", "name": "A", "sort_order": 1, "parent_code": "B", "controls": []},
                    {"code": "B", "name": "B", "sort_order": 2, "parent_code": "A", "controls": []}
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn mapping_for_foreign_control_is_422() {
    let (_state, app) = test_app();
    let (framework_id, _controls) = register_scenario(&app).await;

    let response = app
        .oneshot(post(
            &format!("/v1/frameworks/{framework_id}/mappings"),
            json!({
                "policy_id": uuid::Uuid::new_v4(),
                "control_id": uuid::Uuid::new_v4(),
                "coverage_level": "full"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Export guard -------------------------------------------------------------

#[tokio::test]
async fn exports_of_pending_analysis_are_409() {
    let (state, app) = test_app();

    // A pending record inserted directly: never picked up by a worker, so
    // it stays pending while the export endpoints are probed.
    let record = compass_engine::AnalysisRecord::new_pending(
        compass_core::FrameworkId::new(),
        compass_core::UserId::new(),
    );
    let analysis_id = record.id;
    state.analyses.insert(analysis_id, record);

    for uri in [
        format!("/v1/analyses/{}/export/gaps.csv", analysis_id.as_uuid()),
        format!("/v1/analyses/{}/export/coverage.csv", analysis_id.as_uuid()),
        format!("/v1/analyses/{}/export/summary", analysis_id.as_uuid()),
    ] {
        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT, "{uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "CONFLICT");
    }
}

#[tokio::test]
async fn export_of_unknown_analysis_is_404() {
    let (_state, app) = test_app();
    let response = app
        .oneshot(get(&format!(
            "/v1/analyses/{}/export/summary",
            uuid::Uuid::new_v4()
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Listings and re-runs -----------------------------------------------------

#[tokio::test]
async fn rerun_creates_a_new_record_and_list_is_newest_first() {
    let (_state, app) = test_app();
    let (framework_id, controls) = register_scenario(&app).await;
    map_control(&app, &framework_id, &controls, "A1", "full").await;

    let trigger = json!({
        "framework_id": framework_id,
        "triggered_by": uuid::Uuid::new_v4()
    });

    let first = body_json(
        app.clone()
            .oneshot(post("/v1/analyses", trigger.clone()))
            .await
            .unwrap(),
    )
    .await["id"]
        .as_str()
        .unwrap()
        .to_string();
    poll_terminal(&app, &first).await;

    let second = body_json(
        app.clone()
            .oneshot(post("/v1/analyses", trigger))
            .await
            .unwrap(),
    )
    .await["id"]
        .as_str()
        .unwrap()
        .to_string();
    poll_terminal(&app, &second).await;

    assert_ne!(first, second);

    let response = app
        .clone()
        .oneshot(get(&format!("/v1/analyses?framework_id={framework_id}")))
        .await
        .unwrap();
    let listed = body_json(response).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    // Newest first.
    assert_eq!(listed[1]["id"], first.as_str());
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn openapi_spec_is_served() {
    let (_state, app) = test_app();
    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;
    assert!(spec["paths"]["/v1/analyses"].is_object());
    assert!(spec["paths"]["/v1/frameworks"].is_object());
}
