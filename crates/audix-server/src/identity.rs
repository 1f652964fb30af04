//! Acting-user resolution from the `Authorization` header.

use audix_config::AuthConfig;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;

/// The user on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

impl Actor {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve the acting user. With auth disabled every request is `dev_user`.
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` when auth is enabled and the bearer token
/// is missing or unknown.
pub fn resolve_actor(auth: &AuthConfig, headers: &HeaderMap) -> Result<Actor, ApiError> {
    if !auth.enabled {
        return Ok(Actor(auth.dev_user.clone()));
    }
    let token = bearer_token(headers).ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    auth.user_for_token(token)
        .map(|user| Actor(user.to_string()))
        .ok_or_else(|| ApiError::unauthorized("unknown bearer token"))
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_actor(&state.auth, &parts.headers)
    }
}
