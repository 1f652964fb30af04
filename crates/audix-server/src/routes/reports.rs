//! Report endpoints.

use audix_core::entities::AuditReport;
use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderName};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::common::content_disposition;
use crate::error::ApiResult;
use crate::identity::Actor;
use crate::state::AppState;

/// Carries the id of the report recorded by `POST /audit/reports/generate`.
pub const REPORT_ID_HEADER: &str = "x-report-id";

/// Report route group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/audit/reports", get(list_reports))
        .route("/audit/reports/generate", post(generate_report))
        .route("/audit/reports/{id}", get(get_report))
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateReportPayload {
    template_id: String,
    title: String,
    due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListReportsQuery {
    template_id: Option<String>,
    #[serde(default)]
    skip: u32,
    limit: Option<u32>,
}

/// `POST /audit/reports/generate`: the rendered document as an attachment download.
pub async fn generate_report(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<GenerateReportPayload>,
) -> ApiResult<([(HeaderName, String); 3], Vec<u8>)> {
    let generated = state
        .service
        .generate_report(
            &payload.template_id,
            &payload.title,
            payload.due_date,
            actor.as_str(),
        )
        .await?;
    let disposition = content_disposition(&generated.filename());
    Ok((
        [
            (header::CONTENT_TYPE, generated.rendered.content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (HeaderName::from_static(REPORT_ID_HEADER), generated.report.id),
        ],
        generated.rendered.bytes,
    ))
}

/// `GET /audit/reports`, newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> ApiResult<Json<Vec<AuditReport>>> {
    let reports = state
        .service
        .list_reports(query.template_id.as_deref(), query.skip, query.limit)
        .await?;
    Ok(Json(reports))
}

/// `GET /audit/reports/{id}`
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AuditReport>> {
    Ok(Json(state.service.get_report(&id).await?))
}
