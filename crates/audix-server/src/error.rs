//! HTTP error mapping and the error response payload.

use audix_core::errors::ErrorKind;
use audix_db::error::DatabaseError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Error detail carried in every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorDetail {
    /// Stable error code identifier.
    pub error_code: String,
    /// Human readable message.
    pub message: String,
    /// Whether the same request may succeed if retried unchanged.
    pub retryable: bool,
}

/// Error response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

impl ApiErrorResponse {
    pub(crate) fn new(error_code: &str, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: ApiErrorDetail {
                error_code: error_code.to_string(),
                message: message.into(),
                retryable,
            },
        }
    }
}

/// Errors surfaced by request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A service operation failed.
    #[error(transparent)]
    Service(#[from] DatabaseError),

    /// Request shape was invalid before reaching the service.
    #[error("{message}")]
    BadRequest { message: String },

    /// Missing or unknown bearer credential.
    #[error("{message}")]
    Unauthorized { message: String },

    /// No route matched.
    #[error("{message}")]
    NotFound { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    fn to_status_and_payload(&self) -> (StatusCode, ApiErrorResponse) {
        match self {
            Self::Service(err) => {
                let kind = err.kind();
                let status = match kind {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::DependencyCycle => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::Storage => StatusCode::SERVICE_UNAVAILABLE,
                };
                (
                    status,
                    ApiErrorResponse::new(kind.as_str(), err.to_string(), err.is_retryable()),
                )
            }
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new(ErrorKind::Validation.as_str(), message.clone(), false),
            ),
            Self::Unauthorized { message } => (
                StatusCode::UNAUTHORIZED,
                ApiErrorResponse::new("unauthorized", message.clone(), false),
            ),
            Self::NotFound { message } => (
                StatusCode::NOT_FOUND,
                ApiErrorResponse::new(ErrorKind::NotFound.as_str(), message.clone(), false),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, payload) = self.to_status_and_payload();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, axum::Json(payload)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
