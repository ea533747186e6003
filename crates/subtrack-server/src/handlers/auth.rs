//! Authentication-related handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    clear_session_cookie, session_cookie, session_token, AppError, AppState, AuthUser,
    SuccessResponse,
};
use subtrack_core::auth::{generate_session_token, hash_password, token_hash, verify_password};
use subtrack_core::models::{Role, User};
use subtrack_core::validation;

/// Shown to banned users who have no recorded reason
pub const DEFAULT_BAN_REASON: &str = "Your account has been blocked";

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned on successful sign-in; the token is also set as a cookie
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

/// Open a session and build the response carrying its cookie
fn start_session(state: &AppState, user: User) -> Result<impl IntoResponse, AppError> {
    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::days(state.config.session_ttl_days);
    state
        .db
        .create_session(user.id, &token_hash(&token), expires_at)?;

    let cookie = session_cookie(&token, &state.config);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse { user, token }),
    ))
}

/// POST /api/auth/register - Create an account and sign in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = validation::validate_name(&body.name, "Name")?;
    let email = validation::normalize_email(&body.email)?;
    validation::validate_password(&body.password)?;

    let role = if state.config.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::User
    };

    let password_hash = hash_password(&body.password)?;
    let id = state.db.create_user(&name, &email, &password_hash, role)?;
    let user = state
        .db
        .get_user(id)?
        .ok_or_else(|| AppError::internal("User disappeared after registration"))?;

    info!(user = %email, role = role.as_str(), "Registered new user");
    state
        .db
        .log_audit(&email, "register", Some("user"), Some(id), None)?;

    start_session(&state, user)
}

/// POST /api/auth/login - Exchange credentials for a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = body.email.trim().to_lowercase();

    let Some(credentials) = state.db.get_credentials_by_email(&email)? else {
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    if !verify_password(&body.password, &credentials.password_hash) {
        warn!(user = %email, "Failed login attempt");
        state.db.log_audit(
            &email,
            "login_failed",
            Some("user"),
            Some(credentials.user.id),
            None,
        )?;
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let mut user = credentials.user;
    if user.is_banned {
        state
            .db
            .log_audit(&email, "login_banned", Some("user"), Some(user.id), None)?;
        return Err(AppError::forbidden(
            user.ban_reason.as_deref().unwrap_or(DEFAULT_BAN_REASON),
        ));
    }

    if !user.is_admin() && state.config.is_admin_email(&user.email) {
        state.db.set_user_role(user.id, Role::Admin)?;
        user.role = Role::Admin;
        info!(user = %email, "Promoted bootstrap admin");
    }

    state
        .db
        .log_audit(&email, "login", Some("user"), Some(user.id), None)?;

    start_session(&state, user)
}

/// POST /api/auth/logout - End the current session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        state.db.delete_session(&token_hash(&token))?;
    }

    state
        .db
        .log_audit(&user.email, "logout", Some("user"), Some(user.id), None)?;

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(&state.config))],
        Json(SuccessResponse { success: true }),
    ))
}

/// GET /api/me - The signed-in user
pub async fn get_me(Extension(AuthUser(user)): Extension<AuthUser>) -> Json<User> {
    Json(user)
}
