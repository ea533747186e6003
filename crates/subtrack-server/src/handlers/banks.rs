//! Bank directory handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use subtrack_core::models::Bank;
use subtrack_core::validation;

#[derive(Debug, Deserialize)]
pub struct BankRequest {
    pub name: String,
    pub icon_link: String,
}

impl BankRequest {
    fn validate(&self) -> Result<(String, String), AppError> {
        let name = validation::validate_name(&self.name, "Bank name")?;
        let icon = validation::required_text(&self.icon_link, "Icon link")?;
        Ok((name, icon))
    }
}

/// GET /api/banks
pub async fn list_banks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Bank>>, AppError> {
    Ok(Json(state.db.list_banks()?))
}

/// POST /api/admin/banks
pub async fn admin_create_bank(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(body): Json<BankRequest>,
) -> Result<(StatusCode, Json<Bank>), AppError> {
    let (name, icon) = body.validate()?;
    let id = state.db.create_bank(&name, &icon)?;

    state
        .db
        .log_audit(&admin.email, "create", Some("bank"), Some(id), Some(&name))?;

    let bank = state
        .db
        .get_bank(id)?
        .ok_or_else(|| AppError::internal("Bank disappeared after insert"))?;
    Ok((StatusCode::CREATED, Json(bank)))
}

/// PUT /api/admin/banks/:id
pub async fn admin_update_bank(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<BankRequest>,
) -> Result<Json<Bank>, AppError> {
    let (name, icon) = body.validate()?;
    let bank = state.db.update_bank(id, &name, &icon)?;

    state
        .db
        .log_audit(&admin.email, "update", Some("bank"), Some(id), Some(&name))?;

    Ok(Json(bank))
}

/// DELETE /api/admin/banks/:id - Refused while cards reference the bank
pub async fn admin_delete_bank(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_bank(id)?;

    state
        .db
        .log_audit(&admin.email, "delete", Some("bank"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
