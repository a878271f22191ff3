use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::extract::{ActiveEnvironment, UpstreamAuth};
use super::validation::{validate_api_key_name, validate_identifier};
use super::{ApiError, ApiResponse, AppState, CreateApiKeyRequest, MessageResponse, proxy};
use crate::environment::Network;
use crate::models::ApiKeyDto;

/// GET /api-keys
pub async fn list_api_keys(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    auth: UpstreamAuth,
) -> Result<Json<ApiResponse<Vec<ApiKeyDto>>>, ApiError> {
    let response = state
        .element_pay()
        .list_api_keys(environment, &auth.token)
        .await?;
    let payload = proxy::into_payload(response)?;

    Ok(Json(ApiResponse::success(ApiKeyDto::list_from_value(
        &payload,
    ))))
}

/// POST /api-keys
pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    auth: UpstreamAuth,
    Json(payload): Json<CreateApiKeyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ApiKeyDto>>), ApiError> {
    let name = validate_api_key_name(&payload.name)?;
    let network = payload
        .environment
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<Network>())
        .transpose()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let response = state
        .element_pay()
        .create_api_key(
            environment,
            &auth.token,
            name,
            network.map(Network::as_str),
        )
        .await?;
    let created = proxy::into_payload(response)?;
    let created = created.get("api_key").cloned().unwrap_or(created);

    let key = ApiKeyDto::from_value(&created)
        .ok_or_else(|| ApiError::internal("Element Pay returned an API key without an id"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(key))))
}

/// DELETE /api-keys/{id}
pub async fn delete_api_key(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    auth: UpstreamAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_identifier(&id, "API key id")?;

    let response = state
        .element_pay()
        .delete_api_key(environment, &auth.token, id)
        .await?;
    let message = proxy::into_message(response, "API key deleted")?;

    Ok(Json(ApiResponse::success(MessageResponse::new(message))))
}
