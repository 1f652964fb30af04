//! Dashboard and activity feed endpoints.

use audix_core::activity::ActivityEntry;
use audix_core::responses::DashboardStats;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

/// Analytics route group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/dashboard", get(dashboard))
        .route("/analytics/activity", get(activity))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivityQuery {
    limit: Option<u32>,
}

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.service.dashboard().await?))
}

/// Newest first; `limit` defaults to the configured feed size.
pub async fn activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityEntry>>> {
    let limit = query.limit.unwrap_or(state.settings.activity_limit);
    Ok(Json(state.service.recent_activity(limit).await?))
}
