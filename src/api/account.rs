//! Local accounts backed by the in-memory store.
//!
//! Verification codes are not mailed anywhere; they are written to the log
//! so a developer can complete the flow.

use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use super::auth::{start_session, store_session_user};
use super::extract::CurrentUser;
use super::validation::{require, validate_email, validate_password};
use super::{
    ApiError, ApiResponse, AppState, CredentialsRequest, EmailRequest, LoginResponse,
    MessageResponse, ProfileResponse, SignupRequest, SignupResponse, UpdateProfileRequest,
    VerifyEmailRequest,
};
use crate::models::{SessionSource, SessionUser};
use crate::store::User;

/// POST /account/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SignupResponse>>), ApiError> {
    let name = require(&payload.name, "Name")?;
    let email = validate_email(&payload.email)?;
    let min_len = state.store().security().min_password_length;
    let password = validate_password(&payload.password, min_len)?;

    let (user, code) = state.store().create_user(name, email, password).await?;

    info!(user_id = %user.id, email = %user.email, code = %code, "Verification code issued");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(SignupResponse {
            id: user.id,
            email: user.email,
            verification_required: true,
        })),
    ))
}

/// POST /account/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let email = require(&payload.email, "Email")?;
    let code = require(&payload.code, "Verification code")?;

    let user = state.store().verify_email(email, code).await?;
    info!(user_id = %user.id, "Email verified");

    Ok(Json(ApiResponse::success(user)))
}

/// POST /account/resend-code
pub async fn resend_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = require(&payload.email, "Email")?;

    let code = state.store().regenerate_verification_code(email).await?;
    info!(email = %email, code = %code, "Verification code reissued");

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Verification code sent",
    ))))
}

/// POST /account/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let email = require(&payload.email, "Email")?;
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .store()
        .authenticate(email, &payload.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let environment = state.environment().current();
    let session_user = SessionUser {
        id: user.id,
        email: user.email,
        name: Some(user.name),
        source: SessionSource::Local,
        environment,
        tokens: None,
    };
    start_session(&session, &session_user).await?;

    info!(user_id = %session_user.id, "User logged in locally");

    Ok(Json(ApiResponse::success(LoginResponse {
        user: session_user.view(),
        environment,
    })))
}

/// GET /account/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let profile = state
        .store()
        .get_user_by_id(&user.id)
        .await
        .ok_or_else(|| ApiError::not_found("User", &user.id))?;

    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /account/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    session: Session,
    CurrentUser(mut user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(|n| require(n, "Name"))
        .transpose()?;
    let email = payload.email.as_deref().map(validate_email).transpose()?;

    if name.is_none() && email.is_none() {
        return Err(ApiError::validation("Nothing to update"));
    }

    let update = state.store().update_profile(&user.id, name, email).await?;

    if let Some(code) = &update.verification_code {
        info!(user_id = %user.id, email = %update.user.email, code = %code, "Verification code issued for new email");
    }

    user.email.clone_from(&update.user.email);
    user.name = Some(update.user.name.clone());
    store_session_user(&session, &user).await?;

    Ok(Json(ApiResponse::success(ProfileResponse {
        verification_required: update.verification_code.is_some(),
        user: update.user,
    })))
}
