//! In-memory stand-in for a user database.
//!
//! Backs the parts of the dashboard that are not delegated to Element Pay:
//! the signup/verification flow, profile edits, and demo API keys. Nothing is
//! persisted across restarts.

mod api_keys;
mod users;

pub use api_keys::{ApiKey, generate_key_material};
pub use users::{ProfileUpdate, User, hash_password, verify_password_hash};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::SecurityConfig;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("An account with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Email address is already verified")]
    AlreadyVerified,

    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,

    #[error("API key belongs to another user")]
    NotOwner,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, users::UserRecord>,
    /// Lower-cased email -> user id.
    emails: HashMap<String, String>,
    api_keys: HashMap<String, ApiKey>,
}

#[derive(Clone)]
pub struct MockStore {
    tables: Arc<RwLock<Tables>>,
    security: SecurityConfig,
}

impl MockStore {
    #[must_use]
    pub fn new(security: SecurityConfig) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            security,
        }
    }

    #[must_use]
    pub const fn security(&self) -> &SecurityConfig {
        &self.security
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
pub(crate) fn test_store() -> MockStore {
    MockStore::new(SecurityConfig {
        argon2_memory_cost_kib: 1024,
        argon2_time_cost: 1,
        ..SecurityConfig::default()
    })
}
