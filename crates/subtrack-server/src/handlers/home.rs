//! Home dashboard handler

use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::{AppError, AppState, AuthUser};
use subtrack_core::analytics::{HomeSummary, SpendItem};
use subtrack_core::models::Subscription;

#[derive(Serialize)]
pub struct HomeResponse {
    #[serde(flatten)]
    pub summary: HomeSummary,
    pub subscriptions: Vec<Subscription>,
}

/// GET /api/home - Monthly spend, breakdowns and the subscription list
pub async fn get_home(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<HomeResponse>, AppError> {
    let subscriptions = state.db.list_user_subscriptions(user.id)?;
    let items: Vec<SpendItem> = subscriptions.iter().map(SpendItem::from).collect();
    let summary = HomeSummary::build(&user.name, &items);

    Ok(Json(HomeResponse {
        summary,
        subscriptions,
    }))
}
