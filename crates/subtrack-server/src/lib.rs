//! SubTrack Web Server
//!
//! Axum-based JSON API for the SubTrack subscription tracker.
//!
//! Security features:
//! - Session authentication (HttpOnly cookie or Bearer token, stored as a digest)
//! - Admin-only routes behind a role guard
//! - Restrictive CORS policy
//! - Audit logging for authentication events and admin actions
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use subtrack_core::auth::{token_hash, SESSION_COOKIE, SESSION_TTL_DAYS};
use subtrack_core::db::Database;
use subtrack_core::models::User;

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Bootstrap admin email
pub const ADMIN_EMAIL_ENV: &str = "SUBTRACK_ADMIN_EMAIL";

/// Comma-separated CORS origins
pub const ALLOWED_ORIGINS_ENV: &str = "SUBTRACK_ALLOWED_ORIGINS";

/// Mark session cookies `Secure`
pub const SECURE_COOKIES_ENV: &str = "SUBTRACK_SECURE_COOKIES";

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Users registering or logging in with this email become admins
    pub admin_email: Option<String>,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Session lifetime in days
    pub session_ttl_days: i64,
    /// Add the `Secure` attribute to the session cookie (HTTPS deployments)
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            admin_email: None,
            allowed_origins: vec![],
            session_ttl_days: SESSION_TTL_DAYS,
            secure_cookies: false,
        }
    }
}

impl ServerConfig {
    /// Read configuration from `SUBTRACK_*` environment variables
    pub fn from_env() -> Self {
        let admin_email = std::env::var(ADMIN_EMAIL_ENV)
            .ok()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        let allowed_origins = std::env::var(ALLOWED_ORIGINS_ENV)
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let secure_cookies = std::env::var(SECURE_COOKIES_ENV)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            admin_email,
            allowed_origins,
            secure_cookies,
            ..Self::default()
        }
    }

    /// Whether this email is the configured bootstrap admin
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

/// Parse a comma-separated origin list
pub fn parse_origins(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
}

/// The signed-in user, attached to the request by [`auth_middleware`]
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

/// Session token from `Authorization: Bearer` or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a fresh session token
pub fn session_cookie(token: &str, config: &ServerConfig) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        config.session_ttl_days * 24 * 60 * 60
    );
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(config: &ServerConfig) -> String {
    let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    if config.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Authentication middleware - resolves the session token to a user
///
/// Rejects missing, unknown and expired sessions with 401, and banned users
/// with 403. On success the user is available to handlers as
/// `Extension<AuthUser>`.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let Some(token) = session_token(request.headers()) else {
        debug!(path = %path, "Missing session token");
        return AppError::unauthorized("Authentication required").into_response();
    };

    let user = match state.db.get_session_user(&token_hash(&token)) {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!(path = %path, "Unknown or expired session");
            return AppError::unauthorized("Session expired, please sign in again")
                .into_response();
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    if user.is_banned {
        warn!(user = %user.email, path = %path, "Banned user attempted access");
        return AppError::forbidden(
            user.ban_reason
                .as_deref()
                .unwrap_or(handlers::DEFAULT_BAN_REASON),
        )
        .into_response();
    }

    debug!(user = %user.email, path = %path, "Authenticated via session");
    request.extensions_mut().insert(AuthUser(user));
    next.run(request).await
}

/// Admin guard - must run after [`auth_middleware`]
async fn require_admin(request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<AuthUser>()
        .is_some_and(|AuthUser(user)| user.is_admin());

    if !is_admin {
        return AppError::forbidden("Administrator access required").into_response();
    }
    next.run(request).await
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    let public_routes = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login));

    let admin_routes = Router::new()
        .route("/admin/catalog", get(handlers::admin_list_catalog))
        .route("/admin/catalog/:id", put(handlers::admin_update_catalog_entry))
        .route(
            "/admin/catalog/:id/publish",
            post(handlers::admin_publish_catalog_entry),
        )
        .route(
            "/admin/catalog/:id/remove",
            post(handlers::admin_remove_catalog_entry),
        )
        .route("/admin/users", get(handlers::admin_list_users))
        .route("/admin/users/:id/ban", post(handlers::admin_ban_user))
        .route("/admin/users/:id/unban", post(handlers::admin_unban_user))
        .route("/admin/banks", post(handlers::admin_create_bank))
        .route(
            "/admin/banks/:id",
            put(handlers::admin_update_bank).delete(handlers::admin_delete_bank),
        )
        .route("/admin/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn(require_admin));

    let user_routes = Router::new()
        // Session
        .route("/auth/logout", post(handlers::logout))
        .route("/me", get(handlers::get_me))
        // Dashboard and calendar
        .route("/home", get(handlers::get_home))
        .route("/calendar", get(handlers::get_calendar))
        // Subscriptions
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions).post(handlers::create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(handlers::get_subscription)
                .put(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        // Catalog
        .route("/catalog", get(handlers::search_catalog))
        .route("/catalog/popular", get(handlers::popular_catalog))
        .route("/catalog/categories", get(handlers::catalog_categories))
        .route(
            "/catalog/submissions",
            get(handlers::list_submissions).post(handlers::submit_catalog_entry),
        )
        .route("/catalog/:id", get(handlers::get_catalog_item))
        .route("/catalog/:id/add", post(handlers::quick_add))
        // Payment methods and banks
        .route(
            "/payment-methods",
            get(handlers::list_payment_methods).post(handlers::create_payment_method),
        )
        .route(
            "/payment-methods/:id",
            put(handlers::update_payment_method).delete(handlers::delete_payment_method),
        )
        .route(
            "/payment-methods/:id/default",
            post(handlers::set_default_payment_method),
        )
        .route("/banks", get(handlers::list_banks))
        // Profile and notifications
        .route("/profile", put(handlers::update_profile))
        .route("/profile/password", post(handlers::change_password))
        .route("/notifications", get(handlers::list_notifications))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(user_routes);

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
    };

    // CSP: same-origin scripts, inline styles, remote icons over https
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' https: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, host, port, static_dir, ServerConfig::from_env()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    match db.purge_expired_sessions() {
        Ok(count) if count > 0 => info!("Purged {} expired session(s)", count),
        Ok(_) => {}
        Err(e) => warn!("Failed to purge expired sessions: {}", e),
    }

    match &config.admin_email {
        Some(email) => info!("Bootstrap admin: {}", email),
        None => info!("ℹ️  No bootstrap admin configured (set {} to create one)", ADMIN_EMAIL_ENV),
    }

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Status and client-safe message for domain errors
fn domain_error(err: &subtrack_core::Error) -> Option<(StatusCode, String)> {
    use subtrack_core::Error;

    match err {
        Error::InvalidData(msg) => Some((StatusCode::BAD_REQUEST, msg.clone())),
        Error::Unauthorized(msg) => Some((StatusCode::UNAUTHORIZED, msg.clone())),
        Error::Forbidden(msg) => Some((StatusCode::FORBIDDEN, msg.clone())),
        Error::NotFound(what) => Some((StatusCode::NOT_FOUND, format!("{} not found", what))),
        Error::Conflict(msg) => Some((StatusCode::CONFLICT, msg.clone())),
        _ => None,
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        if let Some((status, message)) = err
            .downcast_ref::<subtrack_core::Error>()
            .and_then(domain_error)
        {
            return Self {
                status,
                message,
                internal: None,
            };
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
