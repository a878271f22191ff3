use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;

use super::extract::{ActiveEnvironment, CurrentUser};
use super::validation::validate_api_key_name;
use super::{
    ApiError, ApiResponse, AppState, CreateApiKeyRequest, DemoApiKeyDto, MessageResponse,
};
use crate::environment::Network;

/// GET /demo/api-keys
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<Vec<DemoApiKeyDto>>> {
    let keys = state
        .store()
        .list_api_keys(&user.id)
        .await
        .iter()
        .map(DemoApiKeyDto::masked)
        .collect();

    Json(ApiResponse::success(keys))
}

/// POST /demo/api-keys
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DemoApiKeyDto>>), ApiError> {
    let name = validate_api_key_name(&payload.name)?;
    let network = match payload.environment.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => value
            .parse::<Network>()
            .map_err(|e| ApiError::validation(e.to_string()))?,
        _ => environment.network(),
    };

    let key = state.store().create_api_key(&user.id, name, network).await?;
    info!(user_id = %user.id, key_id = %key.id, %network, "Demo API key created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(DemoApiKeyDto::revealed(&key))),
    ))
}

/// POST /demo/api-keys/{id}/regenerate
pub async fn regenerate_key(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DemoApiKeyDto>>, ApiError> {
    let key = state.store().regenerate_api_key(&user.id, &id).await?;
    info!(user_id = %user.id, key_id = %key.id, "Demo API key regenerated");

    Ok(Json(ApiResponse::success(DemoApiKeyDto::revealed(&key))))
}

/// DELETE /demo/api-keys/{id}
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let key = state.store().delete_api_key(&user.id, &id).await?;
    info!(user_id = %user.id, key_id = %key.id, "Demo API key deleted");

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "API key '{}' deleted",
        key.name
    )))))
}
