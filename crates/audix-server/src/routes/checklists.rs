//! Checklist and item endpoints.

use audix_core::entities::{Checklist, OwnerRef};
use audix_core::progress::Progress;
use audix_core::responses::{ChecklistOrderResponse, ItemDeletedResponse, ItemMutationResponse};
use audix_db::updates::item::{ItemUpdate, NewItem};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common::double_option;
use crate::error::{ApiError, ApiResult};
use crate::identity::Actor;
use crate::state::AppState;

/// Checklist route group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checklists/", post(create_checklist))
        .route(
            "/checklists/{id}",
            get(get_checklist).delete(delete_checklist),
        )
        .route(
            "/checklists/template/{template_id}",
            get(list_for_template),
        )
        .route("/checklists/report/{report_id}", get(list_for_report))
        .route("/checklists/{id}/items", post(add_item))
        .route(
            "/checklists/{id}/items/{item_id}",
            put(update_item).delete(delete_item),
        )
        .route("/checklists/{id}/progress", get(progress))
        .route("/checklists/{id}/order", get(order))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateChecklistPayload {
    name: String,
    description: Option<String>,
    template_id: Option<String>,
    report_id: Option<String>,
}

impl CreateChecklistPayload {
    fn owner(&self) -> ApiResult<Option<OwnerRef>> {
        match (&self.template_id, &self.report_id) {
            (None, None) => Ok(None),
            (Some(id), None) => Ok(Some(OwnerRef::template(id.clone()))),
            (None, Some(id)) => Ok(Some(OwnerRef::report(id.clone()))),
            (Some(_), Some(_)) => Err(ApiError::bad_request(
                "a checklist belongs to a template or a report, not both",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddItemPayload {
    expected_revision: u32,
    title: String,
    description: Option<String>,
    #[serde(default)]
    is_mandatory: bool,
    order: Option<i64>,
    depends_on_id: Option<String>,
    due_date: Option<DateTime<Utc>>,
}

/// Partial item update. `null` clears `description`, `depends_on_id` and `due_date`.
#[derive(Debug, Deserialize)]
pub(crate) struct UpdateItemPayload {
    expected_revision: u32,
    title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    description: Option<Option<String>>,
    is_mandatory: Option<bool>,
    order: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    depends_on_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    due_date: Option<Option<DateTime<Utc>>>,
    is_completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteItemQuery {
    expected_revision: u32,
}

/// `POST /checklists/`
pub async fn create_checklist(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateChecklistPayload>,
) -> ApiResult<(StatusCode, Json<Checklist>)> {
    let owner = payload.owner()?;
    let checklist = state
        .service
        .create_checklist(
            &payload.name,
            payload.description.as_deref(),
            owner.as_ref(),
            actor.as_str(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(checklist)))
}

/// `GET /checklists/{id}`
pub async fn get_checklist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Checklist>> {
    Ok(Json(state.service.get_checklist(&id).await?))
}

/// `DELETE /checklists/{id}`
pub async fn delete_checklist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
) -> ApiResult<StatusCode> {
    state.service.delete_checklist(&id, actor.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /checklists/template/{template_id}`
pub async fn list_for_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> ApiResult<Json<Vec<Checklist>>> {
    Ok(Json(
        state
            .service
            .list_checklists_for_template(&template_id)
            .await?,
    ))
}

/// `GET /checklists/report/{report_id}`
pub async fn list_for_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> ApiResult<Json<Vec<Checklist>>> {
    Ok(Json(
        state
            .service
            .list_checklists_for(&OwnerRef::report(report_id))
            .await?,
    ))
}

/// `POST /checklists/{id}/items`
pub async fn add_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<AddItemPayload>,
) -> ApiResult<(StatusCode, Json<ItemMutationResponse>)> {
    let new = NewItem {
        title: payload.title,
        description: payload.description,
        is_mandatory: payload.is_mandatory,
        order: payload.order,
        depends_on_id: payload.depends_on_id,
        due_date: payload.due_date,
    };
    let response = state
        .service
        .add_item(&id, payload.expected_revision, new, actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `PUT /checklists/{id}/items/{item_id}`
pub async fn update_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    actor: Actor,
    Json(payload): Json<UpdateItemPayload>,
) -> ApiResult<Json<ItemMutationResponse>> {
    let update = ItemUpdate {
        title: payload.title,
        description: payload.description,
        is_mandatory: payload.is_mandatory,
        order: payload.order,
        depends_on_id: payload.depends_on_id,
        due_date: payload.due_date,
        is_completed: payload.is_completed,
    };
    let response = state
        .service
        .update_item(&id, &item_id, payload.expected_revision, update, actor.as_str())
        .await?;
    Ok(Json(response))
}

/// `DELETE /checklists/{id}/items/{item_id}?expected_revision=N`
pub async fn delete_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    Query(query): Query<DeleteItemQuery>,
    actor: Actor,
) -> ApiResult<Json<ItemDeletedResponse>> {
    let response = state
        .service
        .delete_item(&id, &item_id, query.expected_revision, actor.as_str())
        .await?;
    Ok(Json(response))
}

/// `GET /checklists/{id}/progress`
pub async fn progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Progress>> {
    Ok(Json(state.service.checklist_progress(&id).await?))
}

/// `GET /checklists/{id}/order`
pub async fn order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ChecklistOrderResponse>> {
    Ok(Json(state.service.checklist_order(&id).await?))
}
