//! Router assembly and middleware stack.

use axum::error_handling::HandleErrorLayer;
use axum::extract::OriginalUri;
use axum::http::StatusCode;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, ApiErrorResponse};
use crate::routes;
use crate::state::AppState;

/// Build the full audix REST router.
pub fn audix_router(state: AppState) -> Router {
    let request_timeout = state.settings.request_timeout;
    let concurrency_limit = state.settings.concurrency_limit;

    let router = Router::new()
        .merge(routes::templates::routes())
        .merge(routes::versions::routes())
        .merge(routes::comments::routes())
        .merge(routes::attachments::routes())
        .merge(routes::reports::routes())
        .merge(routes::checklists::routes())
        .merge(routes::analytics::routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    let router = match concurrency_limit {
        Some(limit) => router.layer(ConcurrencyLimitLayer::new(limit)),
        None => router,
    };

    let router = match request_timeout {
        Some(timeout) => router.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(timeout)),
        ),
        None => router,
    };

    router.with_state(state)
}

async fn not_found(uri: OriginalUri) -> ApiError {
    ApiError::NotFound {
        message: format!("not found: {}", uri.0.path()),
    }
}

async fn handle_timeout_error(err: tower::BoxError) -> (StatusCode, Json<ApiErrorResponse>) {
    tracing::warn!(error = %err, "request timed out");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiErrorResponse::new("timeout", "Request timed out", true)),
    )
}
