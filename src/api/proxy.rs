//! Turns Element Pay responses into frontend envelopes.
//!
//! Successful bodies are unwrapped from their `{ data }` envelope; a success
//! status whose JSON does not parse is a generic 500. Error statuses the
//! dashboard knows how to present (400, 401, 403, 404, 409, 422) become the
//! matching [`ApiError`]; everything else collapses into a generic 500 with
//! the upstream message only logged.

use axum::http::StatusCode;
use serde_json::Value;
use tracing::warn;

use super::ApiError;
use crate::clients::UpstreamResponse;
use crate::clients::envelope::{extract_message, unwrap_data, validation_details};

const SESSION_EXPIRED: &str = "Session expired, please log in again";
const FORBIDDEN: &str = "You do not have access to this resource";

/// Unwrapped payload of a successful response, or the mapped error.
pub fn into_payload(response: UpstreamResponse) -> Result<Value, ApiError> {
    if !response.is_success() {
        return Err(map_error(&response));
    }
    reject_malformed(&response)?;
    Ok(unwrap_data(response.body.into_value()))
}

/// Message of a successful response, falling back to `default` when the
/// upstream sent none.
pub fn into_message(response: UpstreamResponse, default: &str) -> Result<String, ApiError> {
    if !response.is_success() {
        return Err(map_error(&response));
    }
    reject_malformed(&response)?;
    Ok(extract_message(&response.body).unwrap_or_else(|| default.to_string()))
}

fn reject_malformed(response: &UpstreamResponse) -> Result<(), ApiError> {
    if response.body.is_malformed() {
        return Err(ApiError::internal(format!(
            "Element Pay returned {} with a body that is not valid JSON",
            response.status.as_u16()
        )));
    }
    Ok(())
}

pub fn map_error(response: &UpstreamResponse) -> ApiError {
    let message = extract_message(&response.body);

    match response.status {
        StatusCode::BAD_REQUEST => {
            ApiError::validation(message.unwrap_or_else(|| "Invalid request".to_string()))
        }
        StatusCode::UNAUTHORIZED => {
            ApiError::unauthorized(message.unwrap_or_else(|| SESSION_EXPIRED.to_string()))
        }
        StatusCode::FORBIDDEN => {
            ApiError::Forbidden(message.unwrap_or_else(|| FORBIDDEN.to_string()))
        }
        StatusCode::NOT_FOUND => {
            ApiError::NotFound(message.unwrap_or_else(|| "Resource not found".to_string()))
        }
        StatusCode::CONFLICT => {
            ApiError::Conflict(message.unwrap_or_else(|| "Resource already exists".to_string()))
        }
        StatusCode::UNPROCESSABLE_ENTITY => {
            let details = validation_details(&response.body);
            let message = message.unwrap_or_else(|| "Validation failed".to_string());
            ApiError::Unprocessable { message, details }
        }
        status => {
            warn!(
                status = status.as_u16(),
                message = message.as_deref().unwrap_or("<none>"),
                "Unexpected Element Pay response"
            );
            ApiError::internal(format!(
                "Element Pay returned {}: {}",
                status.as_u16(),
                message.unwrap_or_default()
            ))
        }
    }
}
