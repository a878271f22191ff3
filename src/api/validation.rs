use regex::Regex;
use std::sync::LazyLock;

use super::ApiError;
use crate::constants::{MAX_API_KEY_NAME_LEN, MAX_ORDER_PAGE_SIZE};

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Trims `value` and rejects it when empty.
pub fn require<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    let email = require(email, "Email")?;
    let valid = EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email));
    if !valid {
        return Err(ApiError::validation(format!(
            "Invalid email address: {email}"
        )));
    }
    Ok(email)
}

pub fn validate_password(password: &str, min_len: usize) -> Result<&str, ApiError> {
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    if password.chars().count() < min_len {
        return Err(ApiError::validation(format!(
            "Password must be at least {min_len} characters"
        )));
    }
    Ok(password)
}

/// Path identifiers forwarded to Element Pay must not be able to alter the
/// upstream path.
pub fn validate_identifier<'a>(id: &'a str, what: &str) -> Result<&'a str, ApiError> {
    let id = require(id, what)?;
    if id.len() > 128
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::validation(format!("Invalid {what}: {id}")));
    }
    Ok(id)
}

pub fn validate_api_key_name(name: &str) -> Result<&str, ApiError> {
    let name = require(name, "API key name")?;
    if name.chars().count() > MAX_API_KEY_NAME_LEN {
        return Err(ApiError::validation(format!(
            "API key name must be {MAX_API_KEY_NAME_LEN} characters or less"
        )));
    }
    Ok(name)
}

pub fn validate_limit(limit: u32) -> Result<u32, ApiError> {
    const MIN_LIMIT: u32 = 1;

    if !(MIN_LIMIT..=MAX_ORDER_PAGE_SIZE).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between {} and {}",
            limit, MIN_LIMIT, MAX_ORDER_PAGE_SIZE
        )));
    }
    Ok(limit)
}

pub fn validate_page(page: u32) -> Result<u32, ApiError> {
    if page == 0 {
        return Err(ApiError::validation("Invalid page: pages start at 1"));
    }
    Ok(page)
}
