//! SubTrack Core Library
//!
//! Shared functionality for the SubTrack subscription tracker:
//! - Database access and migrations
//! - Billing occurrence projection and the month calendar
//! - Spend aggregation by category and card
//! - Catalog search over published entries
//! - Locale-aware name ordering
//! - Input validation, password hashing and session tokens

pub mod analytics;
pub mod auth;
pub mod billing;
pub mod catalog;
pub mod collation;
pub mod db;
pub mod error;
pub mod models;
pub mod validation;

pub use analytics::{
    card_breakdown, category_breakdown, monthly_amount, CardBreakdown, CardStat,
    CategoryBreakdown, CategoryStat, HomeSummary, SpendItem,
};
pub use billing::{
    add_months_clamped, events_for_month, project_occurrences, Billable, BillingEvent,
    MonthSchedule, MonthWindow,
};
pub use catalog::{CatalogItem, CatalogSnapshot, CategoryInfo};
pub use db::{AuditEntry, Database, UserCredentials};
pub use error::{Error, Result};
