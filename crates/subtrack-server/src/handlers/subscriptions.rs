//! Subscription management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use subtrack_core::models::{Category, NewSubscription, NotificationKind, Subscription};
use subtrack_core::validation;

/// A price sent either as a JSON number or as text such as `"9,99"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    pub fn value(&self) -> subtrack_core::Result<f64> {
        match self {
            Self::Number(n) => validation::check_price(*n),
            Self::Text(s) => validation::parse_price(s),
        }
    }
}

/// Body for creating or replacing a subscription
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Category slug; unknown values become `other`
    #[serde(default)]
    pub category: Option<String>,
    pub price: PriceInput,
    /// Billing period in months
    pub period: i64,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub next_payment_at: Option<String>,
    /// One of the user's cards; takes precedence over the free label
    #[serde(default)]
    pub payment_method_id: Option<i64>,
    #[serde(default)]
    pub payment_method_label: Option<String>,
}

/// Validate a request into a storable subscription
fn resolve(
    state: &AppState,
    user_id: i64,
    body: &SubscriptionRequest,
    catalog_id: Option<i64>,
) -> Result<NewSubscription, AppError> {
    let name = validation::validate_name(&body.name, "Name")?;
    let price = body.price.value()?;
    let period = validation::parse_period(body.period)?;
    let next_payment_at = validation::parse_optional_date(body.next_payment_at.as_deref())?;
    let category = body
        .category
        .as_deref()
        .map(Category::from_slug_or_default)
        .unwrap_or_default();

    let (payment_method_id, payment_method_label) = match body.payment_method_id {
        Some(id) => {
            let method = state
                .db
                .get_payment_method(user_id, id)?
                .ok_or_else(|| AppError::bad_request("Payment method not found"))?;
            (Some(method.id), Some(method.label()))
        }
        None => (
            None,
            validation::optional_text(body.payment_method_label.as_deref()),
        ),
    };

    Ok(NewSubscription {
        name,
        icon: validation::optional_text(body.icon.as_deref()).unwrap_or_default(),
        category,
        price,
        period,
        next_payment_at,
        payment_method_id,
        payment_method_label,
        catalog_id,
    })
}

/// "Today" / "Tomorrow" when a payment is that close
fn payment_soon(next_payment_at: Option<NaiveDate>, today: NaiveDate) -> Option<&'static str> {
    let date = next_payment_at?;
    if date == today {
        Some("Today")
    } else if date == today + Duration::days(1) {
        Some("Tomorrow")
    } else {
        None
    }
}

/// GET /api/subscriptions - The user's subscriptions, soonest payment first
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    Ok(Json(state.db.list_user_subscriptions(user.id)?))
}

/// GET /api/subscriptions/:id
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Subscription>, AppError> {
    state
        .db
        .get_user_subscription(user.id, id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Subscription not found"))
}

/// POST /api/subscriptions - Add a subscription
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<SubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let sub = resolve(&state, user.id, &body, None)?;
    let id = state.db.create_user_subscription(user.id, &sub)?;

    state.db.create_notification(
        user.id,
        NotificationKind::Neutral,
        "New subscription",
        &format!("You added {} to your list.", sub.name),
    )?;

    if let Some(when) = payment_soon(sub.next_payment_at, Local::now().date_naive()) {
        state.db.create_notification(
            user.id,
            NotificationKind::Info,
            "Payment soon",
            &format!("{} you will be charged {:.2} for {}.", when, sub.price, sub.name),
        )?;
    }

    let created = state
        .db
        .get_user_subscription(user.id, id)?
        .ok_or_else(|| AppError::internal("Subscription disappeared after insert"))?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/subscriptions/:id - Replace a subscription's fields
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<SubscriptionRequest>,
) -> Result<Json<Subscription>, AppError> {
    let existing = state
        .db
        .get_user_subscription(user.id, id)?
        .ok_or_else(|| AppError::not_found("Subscription not found"))?;

    let sub = resolve(&state, user.id, &body, existing.catalog_id)?;
    Ok(Json(state.db.update_user_subscription(user.id, id, &sub)?))
}

/// DELETE /api/subscriptions/:id
pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_user_subscription(user.id, id)? {
        return Err(AppError::not_found("Subscription not found"));
    }
    Ok(Json(SuccessResponse { success: true }))
}
