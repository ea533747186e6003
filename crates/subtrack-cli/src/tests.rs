//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::NaiveDate;
use subtrack_core::db::Database;
use subtrack_core::models::{BillingPeriod, Category, NewSubscription, Role};
use tempfile::TempDir;

use crate::commands::{self, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn create_user(db: &Database, name: &str, email: &str) -> i64 {
    db.create_user(name, email, "hash", Role::User).unwrap()
}

fn add_subscription(
    db: &Database,
    user_id: i64,
    name: &str,
    category: Category,
    price: f64,
    period: BillingPeriod,
    next: Option<NaiveDate>,
) {
    let sub = NewSubscription {
        name: name.to_string(),
        icon: String::new(),
        category,
        price,
        period,
        next_payment_at: next,
        payment_method_id: None,
        payment_method_label: None,
        catalog_id: None,
    };
    db.create_user_subscription(user_id, &sub).unwrap();
}

// ========== Core Command Tests ==========

#[test]
fn test_open_db_unencrypted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subtrack.db");

    let db = commands::open_db(&path, true).unwrap();
    create_user(&db, "Jane", "jane@example.com");
    drop(db);

    let reopened = commands::open_db(&path, true).unwrap();
    assert_eq!(reopened.count_users().unwrap(), 1);
}

#[test]
fn test_cmd_init() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subtrack.db");

    assert!(commands::cmd_init(&path, true).is_ok());
    assert!(path.exists());
}

#[test]
fn test_cmd_purge_sessions() {
    let db = setup_test_db();
    let user = create_user(&db, "Jane", "jane@example.com");
    let past = chrono::Utc::now() - chrono::Duration::days(1);
    db.create_session(user, "expired-digest", past).unwrap();

    assert!(commands::cmd_purge_sessions(&db).is_ok());
    assert_eq!(db.purge_expired_sessions().unwrap(), 0);
}

// ========== User Command Tests ==========

#[test]
fn test_cmd_promote() {
    let db = setup_test_db();
    let id = create_user(&db, "Jane", "jane@example.com");

    assert!(commands::cmd_promote(&db, "  JANE@example.com ").is_ok());
    assert!(db.get_user(id).unwrap().unwrap().is_admin());

    // Promoting twice is a no-op
    assert!(commands::cmd_promote(&db, "jane@example.com").is_ok());

    let audit = db.list_audit_log(10).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "promote");
}

#[test]
fn test_cmd_promote_unknown_user() {
    let db = setup_test_db();
    let result = commands::cmd_promote(&db, "nobody@example.com");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

// ========== Bank Command Tests ==========

#[test]
fn test_cmd_banks() {
    let db = setup_test_db();
    assert!(commands::cmd_banks_list(&db).is_ok());

    assert!(commands::cmd_banks_add(&db, " Acme Bank ", "https://icons.example.com/acme.png").is_ok());
    let banks = db.list_banks().unwrap();
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].name, "Acme Bank");

    assert!(commands::cmd_banks_list(&db).is_ok());
}

#[test]
fn test_cmd_banks_add_validates() {
    let db = setup_test_db();
    assert!(commands::cmd_banks_add(&db, "A", "https://icons.example.com/a.png").is_err());
    assert!(commands::cmd_banks_add(&db, "Acme", "   ").is_err());
    assert!(db.list_banks().unwrap().is_empty());
}

// ========== Report Command Tests ==========

#[test]
fn test_user_summary() {
    let db = setup_test_db();
    let id = create_user(&db, "Jane Doe", "jane@example.com");
    add_subscription(&db, id, "Netflix", Category::Streaming, 15.0, BillingPeriod::Monthly, None);
    add_subscription(&db, id, "Domain", Category::Other, 120.0, BillingPeriod::Yearly, None);

    let summary = commands::user_summary(&db, "jane@example.com").unwrap();
    assert_eq!(summary.user_initials, "JD");
    assert_eq!(summary.subscriptions_count, 2);
    assert!((summary.monthly_total - 25.0).abs() < 1e-9);
    assert_eq!(summary.category_stats[0].name, "Streaming");

    assert!(commands::cmd_summary(&db, "jane@example.com", false).is_ok());
    assert!(commands::cmd_summary(&db, "jane@example.com", true).is_ok());
}

#[test]
fn test_user_schedule() {
    let db = setup_test_db();
    let id = create_user(&db, "Jane", "jane@example.com");
    add_subscription(
        &db,
        id,
        "Gym",
        Category::Other,
        40.0,
        BillingPeriod::Monthly,
        NaiveDate::from_ymd_opt(2024, 1, 31),
    );
    add_subscription(&db, id, "Undated", Category::Other, 5.0, BillingPeriod::Monthly, None);

    let schedule = commands::user_schedule(&db, "jane@example.com", Some("2024-02")).unwrap();
    assert_eq!(schedule.month, "2024-02");
    assert_eq!(schedule.events.len(), 1);
    assert_eq!(schedule.events[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    assert_eq!(schedule.month_total, 40.0);

    assert!(commands::cmd_calendar(&db, "jane@example.com", Some("2024-02")).is_ok());
    assert!(commands::cmd_calendar(&db, "jane@example.com", None).is_ok());
}

#[test]
fn test_user_schedule_rejects_bad_month() {
    let db = setup_test_db();
    create_user(&db, "Jane", "jane@example.com");

    for month in ["2024-13", "2024-2", "Feb 2024"] {
        assert!(commands::user_schedule(&db, "jane@example.com", Some(month)).is_err());
    }
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Netflix", 10), "Netflix");
    assert_eq!(truncate("YouTube Premium Family", 10), "YouTube...");
    // Multi-byte characters are never split
    assert_eq!(truncate("Acme • **** 4242", 8), "Acme ...");
}
