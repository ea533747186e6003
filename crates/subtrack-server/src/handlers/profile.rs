//! Profile and password handlers

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser, SuccessResponse};
use subtrack_core::auth::{hash_password, verify_password};
use subtrack_core::models::User;
use subtrack_core::validation;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_link: Option<String>,
}

/// PUT /api/profile - Update name, email and avatar
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<User>, AppError> {
    let name = validation::validate_name(&body.name, "Name")?;
    let email = validation::normalize_email(&body.email)?;
    let avatar = validation::normalize_avatar_link(body.avatar_link.as_deref())?;

    let updated = state
        .db
        .update_profile(user.id, &name, &email, avatar.as_deref())?;

    if updated.email != user.email {
        state.db.log_audit(
            &updated.email,
            "change_email",
            Some("user"),
            Some(user.id),
            Some(&format!("from={}", user.email)),
        )?;
    }

    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// POST /api/profile/password - Change password after verifying the current one
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(body): Json<PasswordRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if body.current_password.is_empty()
        || body.new_password.is_empty()
        || body.confirm_password.is_empty()
    {
        return Err(AppError::bad_request("All password fields are required"));
    }
    validation::validate_password(&body.new_password)?;
    if body.new_password != body.confirm_password {
        return Err(AppError::bad_request("Passwords do not match"));
    }

    let stored = state
        .db
        .get_password_hash(user.id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if !verify_password(&body.current_password, &stored) {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    let hash = hash_password(&body.new_password)?;
    state.db.update_password_hash(user.id, &hash)?;

    state.db.log_audit(
        &user.email,
        "change_password",
        Some("user"),
        Some(user.id),
        None,
    )?;

    Ok(Json(SuccessResponse { success: true }))
}
