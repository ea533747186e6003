//! Billing occurrence projection
//!
//! Projects each subscription's billing dates into a calendar month:
//! - Month arithmetic clamps the day to the end of shorter months
//!   (Jan 31 + 1 month = Feb 29 in a leap year)
//! - Occurrences are computed from the anchor date, so a clamped month does
//!   not shift later occurrences (Jan 31 stays "end of month" through April)
//! - Work per subscription is bounded by a hard step ceiling

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::collation::NameOrder;
use crate::models::Subscription;

pub mod calendar;

pub use calendar::{parse_day, CalendarCell, MonthSchedule};

/// Maximum periods skipped while seeking the first occurrence in the window
pub const SEEK_STEP_LIMIT: u32 = 240;

/// Overall step ceiling, including the seek phase
pub const EMIT_STEP_LIMIT: u32 = 260;

/// Add (or subtract, for negative values) whole months, clamping the day to
/// the last valid day of the resulting month.
///
/// Returns `None` only when the result falls outside chrono's date range.
pub fn add_months_clamped(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    MonthWindow::new(year, month).map(|w| w.days())
}

/// A calendar month as the half-open range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthWindow {
    /// First day of the month
    pub start: NaiveDate,
    /// First day of the following month (exclusive)
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let end = add_months_clamped(start, 1)?;
        Some(Self { start, end })
    }

    /// The month a date falls in
    pub fn containing(date: NaiveDate) -> Option<Self> {
        Self::new(date.year(), date.month())
    }

    /// Parse a strict `YYYY-MM` month parameter
    pub fn parse(input: &str) -> Option<Self> {
        let (year, month) = input.split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }

    pub fn days(&self) -> u32 {
        (self.end - self.start).num_days() as u32
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn next(&self) -> Option<Self> {
        Self::containing(self.end)
    }

    pub fn prev(&self) -> Option<Self> {
        Self::containing(self.start.pred_opt()?)
    }

    /// `YYYY-MM` form, the inverse of [`MonthWindow::parse`]
    pub fn param(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

/// Billing dates of one subscription that fall inside `window`, ascending.
///
/// Non-positive periods are treated as monthly. When the step ceiling is hit
/// the result is silently truncated.
pub fn project_occurrences(anchor: NaiveDate, period: i64, window: &MonthWindow) -> Vec<NaiveDate> {
    let period = period.max(1);
    let mut dates = Vec::new();
    let mut steps: u32 = 0;
    let mut occurrence = anchor;

    let step = |n: u32| add_months_clamped(anchor, period.saturating_mul(i64::from(n)));

    while occurrence < window.start && steps < SEEK_STEP_LIMIT {
        steps += 1;
        match step(steps) {
            Some(next) => occurrence = next,
            None => return dates,
        }
    }

    while window.contains(occurrence) && steps < EMIT_STEP_LIMIT {
        dates.push(occurrence);
        steps += 1;
        match step(steps) {
            Some(next) => occurrence = next,
            None => break,
        }
    }

    dates
}

/// The fields of a subscription the projector needs
#[derive(Debug, Clone, PartialEq)]
pub struct Billable {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub price: f64,
    /// Period in months; values below 1 are treated as 1
    pub period: i64,
    /// Next known billing date; `None` means the subscription is not projected
    pub anchor: Option<NaiveDate>,
    pub payment_method_label: Option<String>,
}

impl From<&Subscription> for Billable {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id,
            name: sub.name.clone(),
            icon: sub.icon.clone(),
            price: sub.price,
            period: sub.period.months(),
            anchor: sub.next_payment_at,
            payment_method_label: sub.payment_method_label.clone(),
        }
    }
}

/// One projected charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingEvent {
    /// Stable key: `<subscription id>-<YYYY-MM-DD>`
    pub id: String,
    pub subscription_id: i64,
    pub name: String,
    pub icon: String,
    pub payment_method_label: Option<String>,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Project every subscription into `window`.
///
/// Sorted by date, then by name in collation order, then by exact name.
pub fn events_for_month(subscriptions: &[Billable], window: &MonthWindow) -> Vec<BillingEvent> {
    let mut events: Vec<BillingEvent> = subscriptions
        .iter()
        .filter_map(|sub| sub.anchor.map(|anchor| (sub, anchor)))
        .flat_map(|(sub, anchor)| {
            project_occurrences(anchor, sub.period, window)
                .into_iter()
                .map(move |date| BillingEvent {
                    id: format!("{}-{}", sub.id, date.format("%Y-%m-%d")),
                    subscription_id: sub.id,
                    name: sub.name.clone(),
                    icon: sub.icon.clone(),
                    payment_method_label: sub.payment_method_label.clone(),
                    amount: sub.price,
                    date,
                })
        })
        .collect();

    let mut order = NameOrder::new();
    events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| order.compare(&a.name, &b.name))
    });

    events
}
