//! Template comment endpoints.

use audix_core::entities::TemplateComment;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::identity::Actor;
use crate::state::AppState;

/// Comment route group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/audit/templates/{id}/comments/",
            get(list_comments).post(add_comment),
        )
        .route(
            "/audit/templates/{id}/comments/{comment_id}",
            delete(delete_comment),
        )
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddCommentPayload {
    content: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<TemplateComment>>> {
    Ok(Json(state.service.list_comments(&id).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    Json(payload): Json<AddCommentPayload>,
) -> ApiResult<(StatusCode, Json<TemplateComment>)> {
    let comment = state
        .service
        .add_comment(&id, &payload.content, actor.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
    actor: Actor,
) -> ApiResult<StatusCode> {
    state
        .service
        .delete_comment(&id, &comment_id, actor.as_str())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
