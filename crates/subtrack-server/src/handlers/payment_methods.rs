//! Payment method (card) handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use subtrack_core::models::PaymentMethod;
use subtrack_core::validation;

#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub bank_id: i64,
    pub card_number: String,
}

/// GET /api/payment-methods - The user's cards, default first
pub async fn list_payment_methods(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<PaymentMethod>>, AppError> {
    Ok(Json(state.db.list_payment_methods(user.id)?))
}

/// POST /api/payment-methods - Add a card
pub async fn create_payment_method(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<PaymentMethodRequest>,
) -> Result<(StatusCode, Json<PaymentMethod>), AppError> {
    let card = validation::normalize_card_number(&body.card_number)?;
    let method = state
        .db
        .create_payment_method(user.id, body.bank_id, &card)?;
    Ok((StatusCode::CREATED, Json(method)))
}

/// PUT /api/payment-methods/:id - Change bank or card number
pub async fn update_payment_method(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<PaymentMethodRequest>,
) -> Result<Json<PaymentMethod>, AppError> {
    let card = validation::normalize_card_number(&body.card_number)?;
    Ok(Json(state.db.update_payment_method(
        user.id,
        id,
        body.bank_id,
        &card,
    )?))
}

/// POST /api/payment-methods/:id/default
pub async fn set_default_payment_method(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<PaymentMethod>, AppError> {
    Ok(Json(state.db.set_default_payment_method(user.id, id)?))
}

/// DELETE /api/payment-methods/:id - Refused while subscriptions use the card
pub async fn delete_payment_method(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_payment_method(user.id, id)?;
    Ok(Json(SuccessResponse { success: true }))
}
