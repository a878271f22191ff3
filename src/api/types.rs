use serde::{Deserialize, Serialize};

use crate::clients::envelope::FieldError;
use crate::environment::Environment;
use crate::models::SessionView;
use crate::store::{ApiKey, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            details: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// Missing fields deserialize to empty strings so validation can answer with
// a 400 envelope instead of axum's plain-text rejection.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateApiKeyRequest {
    pub name: String,
    /// `mainnet`/`testnet` (or `live`/`sandbox`); defaults to the network of
    /// the active environment.
    pub environment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetEnvironmentRequest {
    pub environment: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: SessionView,
    pub environment: Environment,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: String,
    pub email: String,
    pub verification_required: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    /// Set when an email change needs to be verified again.
    pub verification_required: bool,
}

/// Demo API key as listed: only a masked preview of the material.
#[derive(Debug, Serialize)]
pub struct DemoApiKeyDto {
    pub id: String,
    pub name: String,
    pub environment: String,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub created_at: String,
}

impl DemoApiKeyDto {
    /// Listing form; the key material is masked.
    #[must_use]
    pub fn masked(key: &ApiKey) -> Self {
        Self::build(key, false)
    }

    /// Shown once, right after creation or regeneration.
    #[must_use]
    pub fn revealed(key: &ApiKey) -> Self {
        Self::build(key, true)
    }

    fn build(key: &ApiKey, reveal: bool) -> Self {
        Self {
            id: key.id.clone(),
            name: key.name.clone(),
            environment: key.environment.to_string(),
            preview: crate::models::upstream::mask_key(&key.key),
            key: reveal.then(|| key.key.clone()),
            created_at: key.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnvironmentDto {
    pub environment: Environment,
    pub base_url: String,
    pub network: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: Environment,
    pub uptime_seconds: u64,
}
