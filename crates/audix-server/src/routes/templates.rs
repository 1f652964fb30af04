//! Template endpoints.

use std::collections::BTreeSet;

use audix_core::entities::{AuditTemplate, TemplateFields};
use audix_core::enums::TemplateStatus;
use audix_db::updates::template::TemplateUpdate;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::common::double_option;
use crate::error::ApiResult;
use crate::identity::Actor;
use crate::state::AppState;

/// Template route group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/audit/templates", get(list_templates).post(create_template))
        .route(
            "/audit/templates/{id}",
            get(get_template)
                .put(update_template)
                .delete(delete_template),
        )
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListTemplatesQuery {
    #[serde(default)]
    skip: u32,
    limit: Option<u32>,
    status: Option<TemplateStatus>,
}

/// Partial update. Omitted fields are kept; `description: null` clears it.
#[derive(Debug, Deserialize)]
pub(crate) struct UpdateTemplatePayload {
    expected_version: u32,
    name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
    content: Option<String>,
    tags: Option<BTreeSet<String>>,
    status: Option<TemplateStatus>,
}

/// `GET /audit/templates`
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> ApiResult<Json<Vec<AuditTemplate>>> {
    let templates = state
        .service
        .list_templates(query.skip, query.limit, query.status)
        .await?;
    Ok(Json(templates))
}

/// `POST /audit/templates`
pub async fn create_template(
    State(state): State<AppState>,
    actor: Actor,
    Json(fields): Json<TemplateFields>,
) -> ApiResult<(StatusCode, Json<AuditTemplate>)> {
    let template = state.service.create_template(fields, actor.as_str()).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// `GET /audit/templates/{id}`
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AuditTemplate>> {
    Ok(Json(state.service.get_template(&id).await?))
}

/// `PUT /audit/templates/{id}`
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<UpdateTemplatePayload>,
) -> ApiResult<Json<AuditTemplate>> {
    let update = TemplateUpdate {
        name: payload.name,
        description: payload.description,
        content: payload.content,
        tags: payload.tags,
        status: payload.status,
    };
    let template = state
        .service
        .update_template(&id, payload.expected_version, update, actor.as_str())
        .await?;
    Ok(Json(template))
}

/// `DELETE /audit/templates/{id}`
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> ApiResult<StatusCode> {
    state.service.delete_template(&id, actor.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}
