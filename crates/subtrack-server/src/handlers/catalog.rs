//! Shared catalog handlers: search, quick-add and user submissions

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::info;

use super::PriceInput;
use crate::{AppError, AppState, AuthUser};
use subtrack_core::catalog::{CatalogItem, CatalogSnapshot, CategoryInfo, POPULAR_LIMIT};
use subtrack_core::models::{
    BillingPeriod, CatalogEntry, CatalogStatus, Category, NewCatalogEntry, NewSubscription,
    NotificationKind, Subscription,
};
use subtrack_core::validation;

fn snapshot(state: &AppState) -> Result<CatalogSnapshot, AppError> {
    Ok(CatalogSnapshot::new(&state.db.list_published_catalog()?))
}

#[derive(Debug, Deserialize)]
pub struct CatalogSearchQuery {
    #[serde(default)]
    pub q: String,
    /// Category slug; unknown slugs are ignored
    pub category: Option<String>,
}

/// GET /api/catalog - Search published entries
pub async fn search_catalog(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogSearchQuery>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    let category = query
        .category
        .as_deref()
        .and_then(|slug| slug.parse::<Category>().ok());
    Ok(Json(snapshot(&state)?.search(&query.q, category)))
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular_limit")]
    pub limit: usize,
}

fn default_popular_limit() -> usize {
    POPULAR_LIMIT
}

/// GET /api/catalog/popular - Most subscribed entries
pub async fn popular_catalog(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<CatalogItem>>, AppError> {
    Ok(Json(snapshot(&state)?.popular(query.limit)))
}

/// GET /api/catalog/categories - Categories that have published entries
pub async fn catalog_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryInfo>>, AppError> {
    Ok(Json(snapshot(&state)?.categories()))
}

/// GET /api/catalog/:id
pub async fn get_catalog_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CatalogItem>, AppError> {
    snapshot(&state)?
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found("Catalog entry not found"))
}

/// POST /api/catalog/:id/add - Attach a published entry as a monthly subscription
pub async fn quick_add(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let item = snapshot(&state)?
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::not_found("Catalog entry not found"))?;

    let sub = NewSubscription {
        name: item.name.clone(),
        icon: item.icon.clone(),
        category: item.category,
        price: item.suggested_monthly_price,
        period: BillingPeriod::Monthly,
        next_payment_at: None,
        payment_method_id: None,
        payment_method_label: None,
        catalog_id: Some(item.id),
    };
    let sub_id = state.db.create_user_subscription(user.id, &sub)?;

    state.db.create_notification(
        user.id,
        NotificationKind::Success,
        "Subscription added",
        &format!("You added {} to your subscriptions.", item.name),
    )?;

    let created = state
        .db
        .get_user_subscription(user.id, sub_id)?
        .ok_or_else(|| AppError::internal("Subscription disappeared after insert"))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Body for proposing a new catalog entry
#[derive(Debug, Deserialize)]
pub struct CatalogEntryRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub category: String,
    pub price: PriceInput,
    pub period: i64,
}

impl CatalogEntryRequest {
    /// Validate; `strict_category` rejects unknown slugs instead of mapping them to `other`
    pub fn validate(&self, strict_category: bool) -> Result<NewCatalogEntry, AppError> {
        let category = if strict_category {
            self.category
                .parse::<Category>()
                .map_err(|e| AppError::bad_request(&e))?
        } else {
            Category::from_slug_or_default(&self.category)
        };

        Ok(NewCatalogEntry {
            name: validation::validate_name(&self.name, "Name")?,
            icon: validation::optional_text(self.icon.as_deref()).unwrap_or_default(),
            category,
            price: self.price.value()?,
            period: validation::parse_period(self.period)?,
        })
    }
}

/// GET /api/catalog/submissions - The user's own submissions, any status
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    Ok(Json(state.db.list_catalog_submissions(user.id)?))
}

/// POST /api/catalog/submissions - Propose an entry for moderation
pub async fn submit_catalog_entry(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<CatalogEntryRequest>,
) -> Result<(StatusCode, Json<CatalogEntry>), AppError> {
    let entry = body.validate(false)?;
    let id = state
        .db
        .create_catalog_entry(&entry, Some(user.id), CatalogStatus::Pending)?;

    info!(user = %user.email, id, "Catalog entry submitted for moderation");

    let created = state
        .db
        .get_catalog_entry(id)?
        .ok_or_else(|| AppError::internal("Catalog entry disappeared after insert"))?;

    Ok((StatusCode::CREATED, Json(created)))
}
