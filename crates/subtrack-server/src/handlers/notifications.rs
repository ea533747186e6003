//! Notification handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, MAX_PAGE_LIMIT};
use subtrack_core::models::Notification;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default = "default_notifications_limit")]
    pub limit: i64,
}

fn default_notifications_limit() -> i64 {
    50
}

/// GET /api/notifications - Newest first
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<NotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    Ok(Json(state.db.list_notifications(user.id, limit)?))
}
