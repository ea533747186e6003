//! Month schedule for the calendar page

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::{BillingEvent, MonthWindow};

/// Parse a strict `YYYY-MM-DD` day parameter
pub fn parse_day(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}

/// One cell of the Monday-first month grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub day: u32,
    pub in_month: bool,
    pub has_events: bool,
    pub is_selected: bool,
    pub is_today: bool,
}

/// Everything the calendar view needs for one month
#[derive(Debug, Clone, Serialize)]
pub struct MonthSchedule {
    pub month: String,
    pub prev_month: Option<String>,
    pub next_month: Option<String>,
    pub selected_day: NaiveDate,
    pub today: NaiveDate,
    pub events: Vec<BillingEvent>,
    pub selected_day_events: Vec<BillingEvent>,
    pub month_total: f64,
    pub unique_subscriptions: usize,
    pub next_event: Option<BillingEvent>,
    pub cells: Vec<CalendarCell>,
}

impl MonthSchedule {
    /// Build the schedule from events already projected into `window`
    pub fn build(
        window: MonthWindow,
        events: Vec<BillingEvent>,
        selected: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let selected_day = selected
            .filter(|d| window.contains(*d))
            .unwrap_or(window.start);

        let by_day = events_by_day(&events);

        let selected_day_events = by_day.get(&selected_day).cloned().unwrap_or_default();
        let month_total = events.iter().map(|e| e.amount).sum();
        let unique_subscriptions = events
            .iter()
            .map(|e| e.subscription_id)
            .collect::<HashSet<_>>()
            .len();

        let next_event = if window.contains(today) {
            events
                .iter()
                .find(|e| e.date >= today)
                .or_else(|| events.first())
                .cloned()
        } else {
            events.first().cloned()
        };

        let cells = grid(&window)
            .into_iter()
            .map(|date| {
                let in_month = window.contains(date);
                CalendarCell {
                    date,
                    day: date.day(),
                    in_month,
                    has_events: in_month && by_day.contains_key(&date),
                    is_selected: in_month && date == selected_day,
                    is_today: date == today,
                }
            })
            .collect();

        Self {
            month: window.param(),
            prev_month: window.prev().map(|w| w.param()),
            next_month: window.next().map(|w| w.param()),
            selected_day,
            today,
            events,
            selected_day_events,
            month_total,
            unique_subscriptions,
            next_event,
            cells,
        }
    }
}

/// Group events by date, keeping the per-day order of the input
pub fn events_by_day(events: &[BillingEvent]) -> BTreeMap<NaiveDate, Vec<BillingEvent>> {
    let mut map: BTreeMap<NaiveDate, Vec<BillingEvent>> = BTreeMap::new();
    for event in events {
        map.entry(event.date).or_default().push(event.clone());
    }
    map
}

/// Dates of a whole-week grid covering the month, starting on Monday
fn grid(window: &MonthWindow) -> Vec<NaiveDate> {
    let leading = i64::from(window.start.weekday().num_days_from_monday());
    let visible = (leading + i64::from(window.days()) + 6) / 7 * 7;
    let first = window.start - Duration::days(leading);
    (0..visible).map(|i| first + Duration::days(i)).collect()
}
