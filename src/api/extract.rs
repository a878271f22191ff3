use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, AppState, auth};
use crate::constants::ENVIRONMENT_HEADER;
use crate::environment::Environment;
use crate::models::SessionUser;

/// Environment a request is served against: the `X-Element-Environment`
/// header when overrides are allowed, otherwise the manager's value.
#[derive(Debug, Clone, Copy)]
pub struct ActiveEnvironment(pub Environment);

impl FromRequestParts<Arc<AppState>> for ActiveEnvironment {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if state.config().environment.allow_request_override
            && let Some(value) = parts.headers.get(ENVIRONMENT_HEADER)
        {
            let value = value
                .to_str()
                .map_err(|_| ApiError::validation("Invalid environment header"))?;
            let environment = value
                .parse::<Environment>()
                .map_err(|e| ApiError::validation(e.to_string()))?;
            return Ok(Self(environment));
        }

        Ok(Self(state.environment().current()))
    }
}

/// Bearer token forwarded to Element Pay.
///
/// Resolution order:
/// 1. `Authorization: Bearer <token>` header
/// 2. access token of the session user
#[derive(Debug, Clone)]
pub struct UpstreamAuth {
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for UpstreamAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(&parts.headers) {
            return Ok(Self { token });
        }

        let session = session_from_parts(parts, state).await?;
        auth::load_session_user(&session)
            .await?
            .and_then(|user| user.tokens)
            .map(|tokens| Self {
                token: tokens.access_token,
            })
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// The logged-in user; 401 when there is no session.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts, state).await?;
        auth::get_session_user(&session).await.map(Self)
    }
}

async fn session_from_parts(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> Result<Session, ApiError> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| ApiError::internal(format!("Session error: {msg}")))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}
