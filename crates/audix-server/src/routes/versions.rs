//! Version history endpoints.

use audix_core::entities::TemplateVersion;
use audix_core::responses::RestoreResponse;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::identity::Actor;
use crate::state::AppState;

/// Version route group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/audit/templates/{id}/versions/", get(list_versions))
        .route("/audit/templates/{id}/versions/{version}", get(get_version))
        .route(
            "/audit/templates/{id}/versions/{version}/restore",
            post(restore_version),
        )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListVersionsQuery {
    before: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RestoreQuery {
    expected_version: Option<u32>,
}

/// `GET /audit/templates/{id}/versions/`, newest first.
pub async fn list_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListVersionsQuery>,
) -> ApiResult<Json<Vec<TemplateVersion>>> {
    let versions = state
        .service
        .list_versions(&id, query.before, query.limit)
        .await?;
    Ok(Json(versions))
}

/// `GET /audit/templates/{id}/versions/{version}`
pub async fn get_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, u32)>,
) -> ApiResult<Json<TemplateVersion>> {
    Ok(Json(state.service.get_version(&id, version).await?))
}

/// `POST /audit/templates/{id}/versions/{version}/restore[?expected_version=N]`
pub async fn restore_version(
    State(state): State<AppState>,
    Path((id, version)): Path<(String, u32)>,
    Query(query): Query<RestoreQuery>,
    actor: Actor,
) -> ApiResult<Json<RestoreResponse>> {
    let restored = state
        .service
        .restore_template(&id, version, query.expected_version, actor.as_str())
        .await?;
    Ok(Json(restored))
}
