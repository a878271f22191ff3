use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use super::extract::{ActiveEnvironment, CurrentUser};
use super::validation::{require, validate_email};
use super::{
    ApiError, ApiResponse, AppState, CredentialsRequest, EmailRequest, LoginResponse,
    MessageResponse, ResetPasswordRequest, SignupRequest, VerifyEmailRequest, proxy,
};
use crate::constants::SESSION_USER_KEY;
use crate::models::{LoginPayload, SessionUser, SessionView, UpstreamTokens};

// ============================================================================
// Middleware
// ============================================================================

/// Rejects requests without a logged-in session user.
pub async fn require_session(session: Session, request: Request, next: Next) -> Response {
    match load_session_user(&session).await {
        Ok(Some(user)) => {
            tracing::Span::current().record("user_id", &user.id);
            next.run(request).await
        }
        Ok(None) => ApiError::unauthorized("Not authenticated").into_response(),
        Err(e) => e.into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate against Element Pay and start a session
pub async fn login(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let email = require(&payload.email, "Email")?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let response = state
        .element_pay()
        .login(environment, email, &payload.password)
        .await?;

    if response.status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let body = proxy::into_payload(response)?;
    let login = LoginPayload::from_value(&body)
        .ok_or_else(|| ApiError::internal("Element Pay login response had no access token"))?;

    let user = SessionUser::from_login(login, email, environment);
    start_session(&session, &user).await?;

    info!(user_id = %user.id, %environment, "User logged in via Element Pay");

    Ok(Json(ApiResponse::success(LoginResponse {
        user: user.view(),
        environment,
    })))
}

/// POST /auth/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to clear session: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out",
    ))))
}

/// GET /auth/session
pub async fn get_session(
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<SessionView>> {
    Json(ApiResponse::success(user.view()))
}

/// POST /auth/refresh
/// Exchange the session's refresh token for a new access token
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let mut user = get_session_user(&session).await?;
    let refresh_token = user
        .tokens
        .as_ref()
        .and_then(|t| t.refresh_token.clone())
        .ok_or_else(|| ApiError::unauthorized("No refresh token available"))?;

    // Tokens belong to the environment the user logged in to.
    let response = state
        .element_pay()
        .refresh_token(user.environment, &refresh_token)
        .await?;

    let body = match proxy::into_payload(response) {
        Ok(body) => body,
        Err(e @ ApiError::Unauthorized(_)) => {
            let _ = session.flush().await;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let refreshed = LoginPayload::from_value(&body)
        .ok_or_else(|| ApiError::internal("Element Pay refresh response had no access token"))?;

    user.tokens = Some(UpstreamTokens {
        access_token: refreshed.access_token,
        refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
    });
    store_session_user(&session, &user).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        environment: user.environment,
        user: user.view(),
    })))
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), ApiError> {
    let email = validate_email(&payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let mut body = json!({ "email": email, "password": payload.password });
    let name = payload.name.trim();
    if !name.is_empty() {
        body["name"] = Value::String(name.to_string());
    }

    let response = state.element_pay().register(environment, &body).await?;
    let created = proxy::into_payload(response)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// POST /auth/verify-email
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = require(&payload.email, "Email")?;
    let code = require(&payload.code, "Verification code")?;

    let response = state
        .element_pay()
        .verify_email(environment, email, code)
        .await?;
    let message = proxy::into_message(response, "Email verified")?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// POST /auth/resend-verification
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = require(&payload.email, "Email")?;

    let response = state
        .element_pay()
        .resend_verification(environment, email)
        .await?;
    let message = proxy::into_message(response, "Verification email sent")?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = require(&payload.email, "Email")?;

    let response = state
        .element_pay()
        .forgot_password(environment, email)
        .await?;
    let message = proxy::into_message(
        response,
        "If an account exists for that email, a reset link has been sent",
    )?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let token = require(&payload.token, "Reset token")?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let response = state
        .element_pay()
        .reset_password(environment, token, &payload.password)
        .await?;
    let message = proxy::into_message(response, "Password has been reset")?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}

// ============================================================================
// Helpers
// ============================================================================

pub(crate) async fn load_session_user(session: &Session) -> Result<Option<SessionUser>, ApiError> {
    session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))
}

/// Get the user from the session, returns error if not authenticated
pub(crate) async fn get_session_user(session: &Session) -> Result<SessionUser, ApiError> {
    load_session_user(session)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
}

pub(crate) async fn store_session_user(session: &Session, user: &SessionUser) -> Result<(), ApiError> {
    session
        .insert(SESSION_USER_KEY, user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update session: {e}")))
}

/// Stores `user` under a fresh session id.
pub(crate) async fn start_session(session: &Session, user: &SessionUser) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    store_session_user(session, user).await
}
