//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Local;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use subtrack_core::db::Database;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@example.com";

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        admin_email: Some(ADMIN_EMAIL.to_string()),
        ..Default::default()
    };
    (create_router(db.clone(), None, config), db)
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
}

/// Register an account and return its session token
async fn register(app: &Router, name: &str, email: &str) -> String {
    let response = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    json["token"].as_str().unwrap().to_string()
}

async fn create_subscription(app: &Router, token: &str, body: Value) -> Value {
    let response = send(app, "POST", "/api/subscriptions", Some(token), Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    get_body_json(response).await
}

// ========== Auth Tests ==========

#[tokio::test]
async fn test_requires_session() {
    let (app, _db) = setup_test_app();

    let response = send(&app, "GET", "/api/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/api/home", Some("not-a-token"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let (app, _db) = setup_test_app();

    let response = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Jane Doe", "email": " Jane@Example.com ", "password": "password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("subtrack_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(!cookie.contains("Secure"));

    let json = get_body_json(response).await;
    assert_eq!(json["user"]["email"], "jane@example.com");
    assert_eq!(json["user"]["role"], "user");

    // The cookie alone authenticates
    let pair = cookie.split(';').next().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("cookie", pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = get_body_json(response).await;
    assert_eq!(me["name"], "Jane Doe");
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _db) = setup_test_app();
    register(&app, "Jane", "jane@example.com").await;

    let cases = [
        (json!({ "name": "Jo", "email": "JANE@example.com", "password": "password123" }), StatusCode::CONFLICT),
        (json!({ "name": "J", "email": "j@example.com", "password": "password123" }), StatusCode::BAD_REQUEST),
        (json!({ "name": "Jo", "email": "not-an-email", "password": "password123" }), StatusCode::BAD_REQUEST),
        (json!({ "name": "Jo", "email": "jo@example.com", "password": "short" }), StatusCode::BAD_REQUEST),
    ];
    for (body, expected) in cases {
        let response = send(&app, "POST", "/api/auth/register", None, Some(body)).await;
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn test_login_and_logout() {
    let (app, _db) = setup_test_app();
    register(&app, "Jane", "jane@example.com").await;

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "jane@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "JANE@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = get_body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send(&app, "POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(cleared.to_str().unwrap().contains("Max-Age=0"));

    let response = send(&app, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bootstrap_admin() {
    let (app, db) = setup_test_app();

    let token = register(&app, "Root", ADMIN_EMAIL).await;
    let me = get_body_json(send(&app, "GET", "/api/me", Some(&token), None).await).await;
    assert_eq!(me["role"], "admin");

    // An account created before the email was configured is promoted on login
    let hash = subtrack_core::auth::hash_password("password123").unwrap();
    db.create_user("Ops", "ops@example.com", &hash, subtrack_core::models::Role::User)
        .unwrap();
    let config = ServerConfig {
        admin_email: Some("ops@example.com".to_string()),
        ..Default::default()
    };
    let app = create_router(db.clone(), None, config);
    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ops@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["role"], "admin");
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane", "jane@example.com").await;

    for uri in ["/api/admin/users", "/api/admin/catalog", "/api/admin/audit"] {
        let response = send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }

    let response = send(
        &app,
        "POST",
        "/api/admin/banks",
        Some(&token),
        Some(json!({ "name": "Acme", "icon_link": "https://icons.example.com/acme.png" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ========== Subscription Tests ==========

#[tokio::test]
async fn test_subscription_crud() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane", "jane@example.com").await;

    let created = create_subscription(
        &app,
        &token,
        json!({ "name": " Netflix ", "category": "streaming", "price": "15,5", "period": 1 }),
    )
    .await;
    assert_eq!(created["name"], "Netflix");
    assert_eq!(created["price"], 15.5);
    assert_eq!(created["category"], "streaming");
    let id = created["id"].as_i64().unwrap();

    // Duplicate names are case-insensitive
    let response = send(
        &app,
        "POST",
        "/api/subscriptions",
        Some(&token),
        Some(json!({ "name": "NETFLIX", "price": 10, "period": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        "PUT",
        &format!("/api/subscriptions/{}", id),
        Some(&token),
        Some(json!({ "name": "Netflix", "category": "made-up", "price": 45, "period": 3, "next_payment_at": "2024-01-31" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = get_body_json(response).await;
    assert_eq!(updated["period"], 3);
    assert_eq!(updated["category"], "other");
    assert_eq!(updated["monthly_price"], 15.0);
    assert_eq!(updated["next_payment_at"], "2024-01-31");

    let response = send(
        &app,
        "DELETE",
        &format!("/api/subscriptions/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "GET",
        &format!("/api/subscriptions/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_validation() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane", "jane@example.com").await;

    let bad = [
        json!({ "name": "N", "price": 10, "period": 1 }),
        json!({ "name": "Netflix", "price": 0, "period": 1 }),
        json!({ "name": "Netflix", "price": "abc", "period": 1 }),
        json!({ "name": "Netflix", "price": 10, "period": 2 }),
        json!({ "name": "Netflix", "price": 10, "period": 1, "next_payment_at": "2024-02-30" }),
        json!({ "name": "Netflix", "price": 10, "period": 1, "payment_method_id": 999 }),
    ];
    for body in bad {
        let response = send(&app, "POST", "/api/subscriptions", Some(&token), Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
    }
}

#[tokio::test]
async fn test_subscriptions_are_scoped_to_owner() {
    let (app, _db) = setup_test_app();
    let jane = register(&app, "Jane", "jane@example.com").await;
    let john = register(&app, "John", "john@example.com").await;

    let created = create_subscription(
        &app,
        &jane,
        json!({ "name": "Spotify", "price": 10, "period": 1 }),
    )
    .await;
    let uri = format!("/api/subscriptions/{}", created["id"]);

    let response = send(&app, "GET", &uri, Some(&john), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, "DELETE", &uri, Some(&john), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let list = get_body_json(send(&app, "GET", "/api/subscriptions", Some(&john), None).await).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_creation_notifications() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane", "jane@example.com").await;

    create_subscription(
        &app,
        &token,
        json!({ "name": "Later", "price": 5, "period": 1, "next_payment_at": "2000-01-01" }),
    )
    .await;
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    create_subscription(
        &app,
        &token,
        json!({ "name": "Soon", "price": 5, "period": 1, "next_payment_at": today }),
    )
    .await;

    let json = get_body_json(send(&app, "GET", "/api/notifications", Some(&token), None).await).await;
    let titles: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles.iter().filter(|t| *t == "New subscription").count(), 2);
    assert_eq!(titles.iter().filter(|t| *t == "Payment soon").count(), 1);
}

// ========== Dashboard and Calendar Tests ==========

#[tokio::test]
async fn test_home_summary() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane Doe", "jane@example.com").await;

    for (name, category, price, period) in [
        ("A Service", "streaming", 20, 1),
        ("B Service", "music", 90, 3),
        ("C Service", "games", 5, 1),
        ("D Service", "ai", 5, 1),
    ] {
        create_subscription(
            &app,
            &token,
            json!({ "name": name, "category": category, "price": price, "period": period }),
        )
        .await;
    }

    let json = get_body_json(send(&app, "GET", "/api/home", Some(&token), None).await).await;
    assert_eq!(json["user_initials"], "JD");
    assert_eq!(json["monthly_total"], 60.0);
    assert_eq!(json["subscriptions_count"], 4);
    assert_eq!(json["subscriptions"].as_array().unwrap().len(), 4);

    let stats = json["category_stats"].as_array().unwrap();
    let names: Vec<_> = stats.iter().map(|s| s["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Music", "Streaming", "Games", "AI"]);
    assert_eq!(stats[0]["share"], 50.0);

    let cards = json["card_stats"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["label"], "No card");
    assert_eq!(cards[0]["subscriptions_count"], 4);
}

#[tokio::test]
async fn test_calendar_month() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane", "jane@example.com").await;

    create_subscription(
        &app,
        &token,
        json!({ "name": "Gym", "price": 40, "period": 1, "next_payment_at": "2024-01-31" }),
    )
    .await;

    let response = send(
        &app,
        "GET",
        "/api/calendar?month=2024-02&day=2024-02-29",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["month"], "2024-02");
    assert_eq!(json["events"][0]["date"], "2024-02-29");
    assert_eq!(json["selected_day"], "2024-02-29");
    assert_eq!(json["selected_day_events"].as_array().unwrap().len(), 1);
    assert_eq!(json["month_total"], 40.0);
    assert_eq!(json["cells"].as_array().unwrap().len() % 7, 0);

    // April clamps to the 30th instead of drifting
    let json = get_body_json(
        send(&app, "GET", "/api/calendar?month=2024-04", Some(&token), None).await,
    )
    .await;
    assert_eq!(json["events"][0]["date"], "2024-04-30");
    assert_eq!(json["selected_day"], "2024-04-01");
}

#[tokio::test]
async fn test_calendar_invalid_params_fall_back() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane", "jane@example.com").await;

    let response = send(
        &app,
        "GET",
        "/api/calendar?month=2024-13&day=yesterday",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let current = Local::now().date_naive().format("%Y-%m").to_string();
    assert_eq!(json["month"], current);
    assert!(json["events"].as_array().unwrap().is_empty());
}

// ========== Catalog and Moderation Tests ==========

#[tokio::test]
async fn test_submission_moderation_flow() {
    let (app, _db) = setup_test_app();
    let admin = register(&app, "Root", ADMIN_EMAIL).await;
    let jane = register(&app, "Jane", "jane@example.com").await;

    let response = send(
        &app,
        "POST",
        "/api/catalog/submissions",
        Some(&jane),
        Some(json!({ "name": "YouTube Premium", "category": "streaming", "price": 36, "period": 3 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry = get_body_json(response).await;
    assert_eq!(entry["status"], "pending");
    let id = entry["id"].as_i64().unwrap();

    // Not searchable until published
    let results = get_body_json(send(&app, "GET", "/api/catalog?q=youtube", Some(&jane), None).await).await;
    assert!(results.as_array().unwrap().is_empty());

    let queue = get_body_json(send(&app, "GET", "/api/admin/catalog", Some(&admin), None).await).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let response = send(
        &app,
        "POST",
        &format!("/api/admin/catalog/{}/publish", id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["status"], "published");

    let results = get_body_json(send(&app, "GET", "/api/catalog?q=YOUTUBE", Some(&jane), None).await).await;
    let item = &results.as_array().unwrap()[0];
    assert_eq!(item["suggested_monthly_price"], 12.0);

    let response = send(
        &app,
        "POST",
        &format!("/api/catalog/{}/add", id),
        Some(&jane),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let sub = get_body_json(response).await;
    assert_eq!(sub["price"], 12.0);
    assert_eq!(sub["period"], 1);
    assert_eq!(sub["catalog_id"], id);
    assert!(sub["next_payment_at"].is_null());

    let popular = get_body_json(send(&app, "GET", "/api/catalog/popular", Some(&jane), None).await).await;
    assert_eq!(popular[0]["subscribers_count"], 1);

    let categories = get_body_json(send(&app, "GET", "/api/catalog/categories", Some(&jane), None).await).await;
    assert_eq!(categories[0]["slug"], "streaming");

    let notifications = get_body_json(send(&app, "GET", "/api/notifications", Some(&jane), None).await).await;
    let kinds: Vec<_> = notifications
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["success", "success"]);
}

#[tokio::test]
async fn test_remove_published_entry_cascades() {
    let (app, _db) = setup_test_app();
    let admin = register(&app, "Root", ADMIN_EMAIL).await;
    let jane = register(&app, "Jane", "jane@example.com").await;

    let response = send(
        &app,
        "POST",
        "/api/catalog/submissions",
        Some(&jane),
        Some(json!({ "name": "Music Box", "category": "music", "price": "9,99", "period": 1 })),
    )
    .await;
    let id = get_body_json(response).await["id"].as_i64().unwrap();
    send(&app, "POST", &format!("/api/admin/catalog/{}/publish", id), Some(&admin), None).await;
    send(&app, "POST", &format!("/api/catalog/{}/add", id), Some(&jane), None).await;

    let response = send(
        &app,
        "POST",
        &format!("/api/admin/catalog/{}/remove", id),
        Some(&admin),
        Some(json!({ "reason": "  " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        &format!("/api/admin/catalog/{}/remove", id),
        Some(&admin),
        Some(json!({ "reason": "Service shut down" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["outcome"], "deleted");
    assert_eq!(json["notified_users"], 1);

    let subs = get_body_json(send(&app, "GET", "/api/subscriptions", Some(&jane), None).await).await;
    assert!(subs.as_array().unwrap().is_empty());

    let response = send(&app, "GET", &format!("/api/catalog/{}", id), Some(&jane), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_edit_requires_known_category() {
    let (app, _db) = setup_test_app();
    let admin = register(&app, "Root", ADMIN_EMAIL).await;

    let response = send(
        &app,
        "POST",
        "/api/catalog/submissions",
        Some(&admin),
        Some(json!({ "name": "Anything", "category": "unknown", "price": 1, "period": 1 })),
    )
    .await;
    let entry = get_body_json(response).await;
    assert_eq!(entry["category"], "other");

    let uri = format!("/api/admin/catalog/{}", entry["id"]);
    let response = send(
        &app,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "name": "Anything", "category": "unknown", "price": 1, "period": 1 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "PUT",
        &uri,
        Some(&admin),
        Some(json!({ "name": "Anything AI", "category": "ai", "price": 2, "period": 1, "comment": "renamed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["category"], "ai");
    assert_eq!(json["moderation_comment"], "renamed");
}

// ========== Users and Bans ==========

#[tokio::test]
async fn test_ban_revokes_access() {
    let (app, _db) = setup_test_app();
    let admin = register(&app, "Root", ADMIN_EMAIL).await;
    let jane = register(&app, "Jane", "jane@example.com").await;
    let me = get_body_json(send(&app, "GET", "/api/me", Some(&jane), None).await).await;
    let jane_id = me["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        &format!("/api/admin/users/{}/ban", jane_id),
        Some(&admin),
        Some(json!({ "reason": "Spam submissions" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["is_banned"], true);

    // Sessions were revoked
    let response = send(&app, "GET", "/api/me", Some(&jane), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "jane@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(get_body_json(response).await["error"], "Spam submissions");

    let banned = get_body_json(
        send(&app, "GET", "/api/admin/users?banned=true", Some(&admin), None).await,
    )
    .await;
    assert_eq!(banned.as_array().unwrap().len(), 1);

    let response = send(
        &app,
        "POST",
        &format!("/api/admin/users/{}/unban", jane_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "jane@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admins_cannot_be_banned() {
    let (app, _db) = setup_test_app();
    let admin = register(&app, "Root", ADMIN_EMAIL).await;
    let me = get_body_json(send(&app, "GET", "/api/me", Some(&admin), None).await).await;

    let response = send(
        &app,
        "POST",
        &format!("/api/admin/users/{}/ban", me["id"]),
        Some(&admin),
        Some(json!({ "reason": "oops" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_audit_log_records_auth_events() {
    let (app, _db) = setup_test_app();
    let admin = register(&app, "Root", ADMIN_EMAIL).await;
    register(&app, "Jane", "jane@example.com").await;

    let response = send(&app, "GET", "/api/admin/audit?limit=5000", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let actions: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions.iter().filter(|a| **a == "register").count(), 2);
}

// ========== Payment Methods and Banks ==========

#[tokio::test]
async fn test_payment_method_flow() {
    let (app, _db) = setup_test_app();
    let admin = register(&app, "Root", ADMIN_EMAIL).await;
    let jane = register(&app, "Jane", "jane@example.com").await;

    let response = send(
        &app,
        "POST",
        "/api/admin/banks",
        Some(&admin),
        Some(json!({ "name": "Acme", "icon_link": "https://icons.example.com/acme.png" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let bank_id = get_body_json(response).await["id"].as_i64().unwrap();

    let banks = get_body_json(send(&app, "GET", "/api/banks", Some(&jane), None).await).await;
    assert_eq!(banks.as_array().unwrap().len(), 1);

    let response = send(
        &app,
        "POST",
        "/api/payment-methods",
        Some(&jane),
        Some(json!({ "bank_id": bank_id, "card_number": "  **** \t 4242 " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let card = get_body_json(response).await;
    assert_eq!(card["card_number"], "**** 4242");
    assert_eq!(card["is_default"], true);
    let card_id = card["id"].as_i64().unwrap();

    let response = send(
        &app,
        "POST",
        "/api/payment-methods",
        Some(&jane),
        Some(json!({ "bank_id": bank_id, "card_number": "**** 4242" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let sub = create_subscription(
        &app,
        &jane,
        json!({ "name": "Netflix", "price": 15, "period": 1, "payment_method_id": card_id }),
    )
    .await;
    assert_eq!(sub["payment_method_label"], "Acme • **** 4242");

    // Cards and banks in use cannot be deleted
    let response = send(
        &app,
        "DELETE",
        &format!("/api/payment-methods/{}", card_id),
        Some(&jane),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response = send(
        &app,
        "DELETE",
        &format!("/api/admin/banks/{}", bank_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Editing the card relabels its subscriptions
    let response = send(
        &app,
        "PUT",
        &format!("/api/payment-methods/{}", card_id),
        Some(&jane),
        Some(json!({ "bank_id": bank_id, "card_number": "**** 9999" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let subs = get_body_json(send(&app, "GET", "/api/subscriptions", Some(&jane), None).await).await;
    assert_eq!(subs[0]["payment_method_label"], "Acme • **** 9999");

    let home = get_body_json(send(&app, "GET", "/api/home", Some(&jane), None).await).await;
    assert_eq!(home["card_stats"][0]["label"], "Acme • **** 9999");
}

// ========== Profile ==========

#[tokio::test]
async fn test_profile_and_password() {
    let (app, _db) = setup_test_app();
    let token = register(&app, "Jane", "jane@example.com").await;
    register(&app, "John", "john@example.com").await;

    let response = send(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({ "name": "Jane Doe", "email": "john@example.com" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({ "name": "Jane Doe", "email": "jane@example.com", "avatar_link": "ftp://nope" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "PUT",
        "/api/profile",
        Some(&token),
        Some(json!({ "name": "Jane Doe", "email": "jane.doe@example.com", "avatar_link": "https://img.example.com/me.png" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["email"], "jane.doe@example.com");

    let bad = [
        json!({ "current_password": "password123", "new_password": "newpassword1", "confirm_password": "different1" }),
        json!({ "current_password": "wrong-password", "new_password": "newpassword1", "confirm_password": "newpassword1" }),
        json!({ "current_password": "password123", "new_password": "short", "confirm_password": "short" }),
        json!({ "new_password": "newpassword1", "confirm_password": "newpassword1" }),
    ];
    for body in bad {
        let response = send(&app, "POST", "/api/profile/password", Some(&token), Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = send(
        &app,
        "POST",
        "/api/profile/password",
        Some(&token),
        Some(json!({ "current_password": "password123", "new_password": "newpassword1", "confirm_password": "newpassword1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "jane.doe@example.com", "password": "newpassword1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ========== Security Headers ==========

#[tokio::test]
async fn test_security_headers() {
    let (app, _db) = setup_test_app();

    let response = send(&app, "GET", "/api/me", None, None).await;
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
}

// ========== Helpers ==========

#[test]
fn test_session_token_sources() {
    let mut headers = HeaderMap::new();
    assert_eq!(session_token(&headers), None);

    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("theme=dark; subtrack_session=abc123"),
    );
    assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

    // Bearer wins over the cookie
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
    assert_eq!(session_token(&headers).as_deref(), Some("xyz"));

    let mut empty = HeaderMap::new();
    empty.insert(header::COOKIE, HeaderValue::from_static("subtrack_session="));
    assert_eq!(session_token(&empty), None);
}

#[test]
fn test_session_cookie_attributes() {
    let config = ServerConfig {
        secure_cookies: true,
        ..Default::default()
    };
    let cookie = session_cookie("tok", &config);
    assert!(cookie.starts_with("subtrack_session=tok;"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(cookie.ends_with("; Secure"));
    assert!(clear_session_cookie(&config).contains("Max-Age=0"));
}

#[test]
fn test_parse_origins() {
    assert_eq!(
        parse_origins(" https://a.example.com ,, https://b.example.com"),
        vec!["https://a.example.com", "https://b.example.com"]
    );
    assert!(parse_origins("").is_empty());
}

#[test]
fn test_core_errors_map_to_status() {
    use subtrack_core::Error;

    let cases = [
        (Error::InvalidData("x".into()), StatusCode::BAD_REQUEST),
        (Error::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
        (Error::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (Error::NotFound("x".into()), StatusCode::NOT_FOUND),
        (Error::Conflict("x".into()), StatusCode::CONFLICT),
        (Error::Encryption("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
        assert_eq!(AppError::from(err).status(), status);
    }
}
