//! Admin handlers: catalog moderation and user management
//!
//! All routes here sit behind the admin guard, and every mutation is
//! recorded in the audit log under the acting admin's email.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::CatalogEntryRequest;
use crate::{AppError, AppState, AuthUser};
use subtrack_core::db::RemovalOutcome;
use subtrack_core::models::{
    BillingPeriod, CatalogEntry, CatalogFilter, CatalogStatus, Category, Role, User, UserFilter,
};
use subtrack_core::validation;

#[derive(Debug, Deserialize)]
pub struct AdminCatalogQuery {
    /// `pending` (default), `published` or `rejected`
    pub status: Option<String>,
    pub q: Option<String>,
    pub category: Option<String>,
    pub period: Option<i64>,
}

/// GET /api/admin/catalog - Moderation queue or published list
pub async fn admin_list_catalog(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminCatalogQuery>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let status = match query.status.as_deref() {
        None | Some("") => CatalogStatus::Pending,
        Some(s) => s
            .parse::<CatalogStatus>()
            .map_err(|e| AppError::bad_request(&e))?,
    };

    let filter = CatalogFilter {
        status,
        query: validation::optional_text(query.q.as_deref()),
        category: query
            .category
            .as_deref()
            .and_then(|c| c.parse::<Category>().ok()),
        period: query.period.and_then(|p| BillingPeriod::try_from(p).ok()),
    };

    Ok(Json(state.db.list_catalog(&filter)?))
}

#[derive(Debug, Deserialize)]
pub struct ModerationUpdateRequest {
    #[serde(flatten)]
    pub entry: CatalogEntryRequest,
    #[serde(default)]
    pub comment: Option<String>,
}

/// PUT /api/admin/catalog/:id - Edit an entry
pub async fn admin_update_catalog_entry(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<ModerationUpdateRequest>,
) -> Result<Json<CatalogEntry>, AppError> {
    let entry = body.entry.validate(true)?;
    let comment = validation::optional_text(body.comment.as_deref());

    let updated = state
        .db
        .update_catalog_entry(id, &entry, admin.id, comment.as_deref())?;

    state.db.log_audit(
        &admin.email,
        "update",
        Some("catalog_entry"),
        Some(id),
        Some(&updated.name),
    )?;

    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub comment: Option<String>,
}

/// POST /api/admin/catalog/:id/publish
pub async fn admin_publish_catalog_entry(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    body: Option<Json<PublishRequest>>,
) -> Result<Json<CatalogEntry>, AppError> {
    let comment = body.and_then(|Json(b)| validation::optional_text(b.comment.as_deref()));

    let entry = state
        .db
        .publish_catalog_entry(id, admin.id, comment.as_deref())?;

    info!(user = %admin.email, id, "Published catalog entry");
    state.db.log_audit(
        &admin.email,
        "publish",
        Some("catalog_entry"),
        Some(id),
        Some(&entry.name),
    )?;

    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    #[serde(default)]
    pub reason: String,
}

/// Result of removing a catalog entry
#[derive(Serialize)]
pub struct RemovalResponse {
    /// `rejected` or `deleted`
    pub outcome: &'static str,
    pub entry: CatalogEntry,
    pub notified_users: usize,
}

impl From<RemovalOutcome> for RemovalResponse {
    fn from(outcome: RemovalOutcome) -> Self {
        match outcome {
            RemovalOutcome::Rejected(entry) => Self {
                outcome: "rejected",
                notified_users: usize::from(entry.created_by.is_some()),
                entry,
            },
            RemovalOutcome::Deleted {
                entry,
                notified_users,
            } => Self {
                outcome: "deleted",
                entry,
                notified_users,
            },
        }
    }
}

/// POST /api/admin/catalog/:id/remove - Reject a submission or delete an entry
pub async fn admin_remove_catalog_entry(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<ReasonRequest>,
) -> Result<Json<RemovalResponse>, AppError> {
    let reason = validation::required_text(&body.reason, "Reason")?;

    let response = RemovalResponse::from(state.db.remove_catalog_entry(id, admin.id, &reason)?);

    info!(user = %admin.email, id, outcome = response.outcome, "Removed catalog entry");
    state.db.log_audit(
        &admin.email,
        response.outcome,
        Some("catalog_entry"),
        Some(id),
        Some(&format!("reason={}", reason)),
    )?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct AdminUsersQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub banned: Option<bool>,
}

/// GET /api/admin/users - Admins first, then newest
pub async fn admin_list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminUsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let filter = UserFilter {
        query: validation::optional_text(query.q.as_deref()),
        role: query.role.as_deref().and_then(|r| r.parse::<Role>().ok()),
        banned: query.banned,
    };
    Ok(Json(state.db.list_users(&filter)?))
}

/// POST /api/admin/users/:id/ban - Block a user and revoke their sessions
pub async fn admin_ban_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<ReasonRequest>,
) -> Result<Json<User>, AppError> {
    let reason = validation::required_text(&body.reason, "Reason")?;
    let user = state.db.ban_user(id, &reason)?;

    info!(user = %admin.email, target = %user.email, "Banned user");
    state.db.log_audit(
        &admin.email,
        "ban",
        Some("user"),
        Some(id),
        Some(&format!("reason={}", reason)),
    )?;

    Ok(Json(user))
}

/// POST /api/admin/users/:id/unban
pub async fn admin_unban_user(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    let user = state.db.unban_user(id)?;

    info!(user = %admin.email, target = %user.email, "Unbanned user");
    state
        .db
        .log_audit(&admin.email, "unban", Some("user"), Some(id), None)?;

    Ok(Json(user))
}
