//! Payment calendar handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Local;
use serde::Deserialize;

use crate::{AppError, AppState, AuthUser};
use subtrack_core::billing::{events_for_month, parse_day, Billable, MonthSchedule, MonthWindow};

/// Query params for the calendar
///
/// Both are optional and parsed strictly; anything malformed falls back to
/// the current month and its first day.
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// `YYYY-MM`
    pub month: Option<String>,
    /// `YYYY-MM-DD`
    pub day: Option<String>,
}

/// GET /api/calendar - Projected charges for one month
pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthSchedule>, AppError> {
    let today = Local::now().date_naive();

    let window = query
        .month
        .as_deref()
        .and_then(MonthWindow::parse)
        .or_else(|| MonthWindow::containing(today))
        .ok_or_else(|| AppError::internal("Current month is out of range"))?;
    let selected = query.day.as_deref().and_then(parse_day);

    let subscriptions = state.db.list_user_subscriptions(user.id)?;
    let billables: Vec<Billable> = subscriptions.iter().map(Billable::from).collect();
    let events = events_for_month(&billables, &window);

    Ok(Json(MonthSchedule::build(window, events, selected, today)))
}
