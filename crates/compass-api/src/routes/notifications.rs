//! # Notification Records API
//!
//! Read access to the notifications the orchestrator records on terminal
//! analysis states. Delivery (email, webhooks, in-app feeds) belongs to the
//! surrounding platform; this surface only exposes the records.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use compass_core::UserId;

use crate::state::{AppState, NotificationRecord};

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/notifications/:user_id", get(list_notifications))
}

/// GET /v1/notifications/:user_id — Notifications for a user, newest first.
#[utoipa::path(
    get,
    path = "/v1/notifications/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Notifications, newest first", body = Vec<NotificationRecord>),
    ),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<Vec<NotificationRecord>> {
    let user = UserId(user_id);
    let mut records: Vec<NotificationRecord> = state
        .notifications
        .list()
        .into_iter()
        .filter(|n| n.user_id == user)
        .collect();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Json(records)
}
