//! Domain models for SubTrack

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub avatar_link: Option<String>,
    pub role: Role,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub banned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Filter for the admin user listing
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match against name or email
    pub query: Option<String>,
    pub role: Option<Role>,
    pub banned: Option<bool>,
}

/// Subscription category
///
/// The set is fixed; anything outside it is treated as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Streaming,
    Music,
    Games,
    Shopping,
    Ai,
    Finance,
    #[default]
    Other,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 7] = [
        Self::Streaming,
        Self::Music,
        Self::Games,
        Self::Shopping,
        Self::Ai,
        Self::Finance,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Music => "music",
            Self::Games => "games",
            Self::Shopping => "shopping",
            Self::Ai => "ai",
            Self::Finance => "finance",
            Self::Other => "other",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Streaming => "Streaming",
            Self::Music => "Music",
            Self::Games => "Games",
            Self::Shopping => "Shopping",
            Self::Ai => "AI",
            Self::Finance => "Finance",
            Self::Other => "Other",
        }
    }

    /// Lenient parse used for user input: unknown slugs become `Other`
    pub fn from_slug_or_default(slug: &str) -> Self {
        slug.parse().unwrap_or_default()
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Billing period in whole months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "i64", into = "i64")]
pub enum BillingPeriod {
    #[default]
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl BillingPeriod {
    pub const ALL: [BillingPeriod; 4] = [
        Self::Monthly,
        Self::Quarterly,
        Self::HalfYearly,
        Self::Yearly,
    ];

    pub fn months(&self) -> i64 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::HalfYearly => 6,
            Self::Yearly => 12,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> String {
        match self {
            Self::Monthly => "Monthly".to_string(),
            Self::Yearly => "Yearly".to_string(),
            other => format!("Every {} months", other.months()),
        }
    }
}

impl TryFrom<i64> for BillingPeriod {
    type Error = String;

    fn try_from(months: i64) -> std::result::Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.months() == months)
            .ok_or_else(|| format!("Unsupported billing period: {} months", months))
    }
}

impl From<BillingPeriod> for i64 {
    fn from(period: BillingPeriod) -> Self {
        period.months()
    }
}

/// A subscription attached to a user's account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    /// Catalog entry this subscription was added from, if any
    pub catalog_id: Option<i64>,
    pub name: String,
    pub icon: String,
    pub category: Category,
    pub price: f64,
    /// `price` spread over the billing period
    pub monthly_price: f64,
    pub period: BillingPeriod,
    pub next_payment_at: Option<NaiveDate>,
    pub payment_method_id: Option<i64>,
    pub payment_method_label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for creating or updating a user subscription
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub name: String,
    pub icon: String,
    pub category: Category,
    pub price: f64,
    pub period: BillingPeriod,
    pub next_payment_at: Option<NaiveDate>,
    pub payment_method_id: Option<i64>,
    pub payment_method_label: Option<String>,
    pub catalog_id: Option<i64>,
}

/// Moderation status of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus {
    Pending,
    Published,
    Rejected,
}

impl CatalogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for CatalogStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown catalog status: {}", s)),
        }
    }
}

/// A shared catalog offering (e.g. "Netflix, 799/month")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub category: Category,
    pub price: f64,
    pub period: BillingPeriod,
    pub status: CatalogStatus,
    pub created_by: Option<i64>,
    pub moderated_by: Option<i64>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub moderation_comment: Option<String>,
    /// Number of non-banned users subscribed through this entry
    pub subscribers_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating or editing a catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewCatalogEntry {
    pub name: String,
    pub icon: String,
    pub category: Category,
    pub price: f64,
    pub period: BillingPeriod,
}

/// Filter for admin catalog listings
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    pub status: CatalogStatus,
    pub query: Option<String>,
    pub category: Option<Category>,
    pub period: Option<BillingPeriod>,
}

impl CatalogFilter {
    pub fn status(status: CatalogStatus) -> Self {
        Self {
            status,
            query: None,
            category: None,
            period: None,
        }
    }
}

/// A bank users can pick for their payment methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: i64,
    pub name: String,
    pub icon_link: String,
    pub created_at: DateTime<Utc>,
}

/// A user's card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub user_id: i64,
    pub bank_id: i64,
    pub bank_name: String,
    pub bank_icon: String,
    pub card_number: String,
    pub is_default: bool,
    /// Number of subscriptions charged to this card
    pub subscriptions_count: i64,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    pub fn label(&self) -> String {
        payment_method_label(&self.bank_name, &self.card_number)
    }
}

/// Display label for a card, e.g. `"Acme Bank • **** 1234"`
pub fn payment_method_label(bank_name: &str, card_number: &str) -> String {
    let bank = match bank_name.trim() {
        "" => "Bank",
        b => b,
    };
    let card = match card_number.trim() {
        "" => "****",
        c => c,
    };
    format!("{} • {}", bank, card)
}

/// Notification kind, drives the icon shown next to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Neutral,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Neutral => "neutral",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "neutral" => Ok(Self::Neutral),
            _ => Err(format!("Unknown notification kind: {}", s)),
        }
    }
}

/// A message shown on the user's notifications page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
