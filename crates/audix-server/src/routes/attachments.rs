//! Attachment endpoints for templates and reports.

use audix_core::entities::{Attachment, OwnerRef};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header::{self, HeaderName};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};

use super::common::content_disposition;
use crate::error::{ApiError, ApiResult};
use crate::identity::Actor;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const FILE_FIELD: &str = "file";

type Download = ([(HeaderName, String); 2], Vec<u8>);

/// Attachment route group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/audit/templates/{id}/attachments",
            get(list_template_attachments).post(upload_template_attachment),
        )
        .route(
            "/audit/templates/{id}/attachments/{attachment_id}",
            delete(delete_template_attachment),
        )
        .route(
            "/audit/templates/{id}/attachments/{attachment_id}/download",
            get(download_template_attachment),
        )
        .route(
            "/audit/reports/{id}/attachments",
            get(list_report_attachments).post(upload_report_attachment),
        )
        .route(
            "/audit/reports/{id}/attachments/{attachment_id}",
            delete(delete_report_attachment),
        )
        .route(
            "/audit/reports/{id}/attachments/{attachment_id}/download",
            get(download_report_attachment),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

struct Upload {
    filename: String,
    mime_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("file part has no filename"))?;
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(err.body_text()))?;
        return Ok(Upload {
            filename,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::bad_request(format!(
        "missing multipart field: {FILE_FIELD}"
    )))
}

async fn list(state: &AppState, owner: &OwnerRef) -> ApiResult<Json<Vec<Attachment>>> {
    Ok(Json(state.service.list_attachments(owner).await?))
}

async fn upload(
    state: &AppState,
    owner: &OwnerRef,
    actor: &Actor,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    let upload = read_upload(multipart).await?;
    let attachment = state
        .service
        .upload_attachment(
            owner,
            &upload.filename,
            upload.mime_type.as_deref(),
            upload.bytes,
            actor.as_str(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

async fn download(
    state: &AppState,
    owner: &OwnerRef,
    attachment_id: &str,
) -> ApiResult<Download> {
    let (attachment, bytes) = state
        .service
        .download_attachment(owner, attachment_id)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, attachment.mime_type),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&attachment.original_filename),
            ),
        ],
        bytes,
    ))
}

async fn remove(
    state: &AppState,
    owner: &OwnerRef,
    attachment_id: &str,
    actor: &Actor,
) -> ApiResult<StatusCode> {
    state
        .service
        .delete_attachment(owner, attachment_id, actor.as_str())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_template_attachments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Attachment>>> {
    list(&state, &OwnerRef::template(id)).await
}

pub async fn upload_template_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    upload(&state, &OwnerRef::template(id), &actor, multipart).await
}

pub async fn download_template_attachment(
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(String, String)>,
) -> ApiResult<Download> {
    download(&state, &OwnerRef::template(id), &attachment_id).await
}

pub async fn delete_template_attachment(
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(String, String)>,
    actor: Actor,
) -> ApiResult<StatusCode> {
    remove(&state, &OwnerRef::template(id), &attachment_id, &actor).await
}

pub async fn list_report_attachments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Attachment>>> {
    list(&state, &OwnerRef::report(id)).await
}

pub async fn upload_report_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    actor: Actor,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Attachment>)> {
    upload(&state, &OwnerRef::report(id), &actor, multipart).await
}

pub async fn download_report_attachment(
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(String, String)>,
) -> ApiResult<Download> {
    download(&state, &OwnerRef::report(id), &attachment_id).await
}

pub async fn delete_report_attachment(
    State(state): State<AppState>,
    Path((id, attachment_id)): Path<(String, String)>,
    actor: Actor,
) -> ApiResult<StatusCode> {
    remove(&state, &OwnerRef::report(id), &attachment_id, &actor).await
}
