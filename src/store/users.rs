use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task;
use tracing::debug;

use super::{MockStore, StoreError, normalize_email};
use crate::config::SecurityConfig;

/// User data returned from the store (without the password hash)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct VerificationCode {
    code: String,
    expires_at: DateTime<Utc>,
}

pub(super) struct UserRecord {
    user: User,
    password_hash: String,
    verification: Option<VerificationCode>,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub user: User,
    /// Issued when the email changed and has to be verified again.
    pub verification_code: Option<String>,
}

impl MockStore {
    fn new_code(&self) -> VerificationCode {
        VerificationCode {
            code: generate_verification_code(),
            expires_at: Utc::now() + Duration::minutes(self.security.verification_code_ttl_minutes),
        }
    }

    /// Creates an unverified user and returns it with its verification code.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), StoreError> {
        let email = normalize_email(email);

        if self.tables.read().await.emails.contains_key(&email) {
            return Err(StoreError::DuplicateEmail(email));
        }

        let password = password.to_string();
        let security = self.security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        let now = Utc::now();
        let verification = self.new_code();
        let code = verification.code.clone();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.clone(),
            email_verified: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        let mut tables = self.tables.write().await;
        // Re-check: another signup may have won while we were hashing.
        if tables.emails.contains_key(&email) {
            return Err(StoreError::DuplicateEmail(email));
        }
        tables.emails.insert(email, user.id.clone());
        tables.users.insert(
            user.id.clone(),
            UserRecord {
                user: user.clone(),
                password_hash,
                verification: Some(verification),
            },
        );

        debug!(user_id = %user.id, "Created mock user");
        Ok((user, code))
    }

    /// Inserts an already verified user; used to seed local development.
    pub async fn seed_verified_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, StoreError> {
        let (user, code) = self.create_user(name, email, password).await?;
        self.verify_email(&user.email, &code).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Option<User> {
        self.tables
            .read()
            .await
            .users
            .get(id)
            .map(|record| record.user.clone())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Option<User> {
        let tables = self.tables.read().await;
        tables
            .emails
            .get(&normalize_email(email))
            .and_then(|id| tables.users.get(id))
            .map(|record| record.user.clone())
    }

    /// Pending verification code for a user, if any.
    pub async fn verification_code(&self, email: &str) -> Option<String> {
        let tables = self.tables.read().await;
        let id = tables.emails.get(&normalize_email(email))?;
        tables
            .users
            .get(id)?
            .verification
            .as_ref()
            .map(|v| v.code.clone())
    }

    /// Checks credentials. Returns `Ok(None)` for unknown users and wrong
    /// passwords alike; a successful login of a verified user records
    /// `last_login`.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);

        let lookup = {
            let tables = self.tables.read().await;
            tables
                .emails
                .get(&email)
                .and_then(|id| tables.users.get(id))
                .map(|record| (record.user.id.clone(), record.password_hash.clone()))
        };

        let Some((user_id, password_hash)) = lookup else {
            return Ok(None);
        };

        let password = password.to_string();
        let is_valid = task::spawn_blocking(move || verify_password_hash(&password_hash, &password))
            .await
            .context("Password verification task panicked")??;

        if !is_valid {
            return Ok(None);
        }

        let mut tables = self.tables.write().await;
        let record = tables
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound("User"))?;

        if !record.user.email_verified {
            return Err(StoreError::EmailNotVerified);
        }

        record.user.last_login = Some(Utc::now());
        Ok(Some(record.user.clone()))
    }

    pub async fn verify_email(&self, email: &str, code: &str) -> Result<User, StoreError> {
        let email = normalize_email(email);
        let mut tables = self.tables.write().await;

        let id = tables
            .emails
            .get(&email)
            .cloned()
            .ok_or(StoreError::NotFound("User"))?;
        let record = tables
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound("User"))?;

        if record.user.email_verified {
            return Err(StoreError::AlreadyVerified);
        }

        let matches = record
            .verification
            .as_ref()
            .is_some_and(|v| v.code == code.trim() && v.expires_at > Utc::now());
        if !matches {
            return Err(StoreError::InvalidVerificationCode);
        }

        let now = Utc::now();
        record.verification = None;
        record.user.email_verified = true;
        record.user.updated_at = now;

        Ok(record.user.clone())
    }

    /// Replaces the pending verification code and returns the new one.
    pub async fn regenerate_verification_code(&self, email: &str) -> Result<String, StoreError> {
        let email = normalize_email(email);
        let verification = self.new_code();
        let mut tables = self.tables.write().await;

        let id = tables
            .emails
            .get(&email)
            .cloned()
            .ok_or(StoreError::NotFound("User"))?;
        let record = tables
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound("User"))?;

        if record.user.email_verified {
            return Err(StoreError::AlreadyVerified);
        }

        let code = verification.code.clone();
        record.verification = Some(verification);
        Ok(code)
    }

    /// Updates name and/or email. Changing the email re-indexes the user and
    /// requires the new address to be verified.
    pub async fn update_profile(
        &self,
        user_id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<ProfileUpdate, StoreError> {
        let new_email = email.map(normalize_email);
        let verification = self.new_code();
        let mut tables = self.tables.write().await;

        let current_email = tables
            .users
            .get(user_id)
            .map(|record| record.user.email.clone())
            .ok_or(StoreError::NotFound("User"))?;

        let email_changed = new_email.as_ref().filter(|e| **e != current_email).cloned();
        if let Some(ref email) = email_changed
            && tables.emails.contains_key(email)
        {
            return Err(StoreError::DuplicateEmail(email.clone()));
        }

        if let Some(ref email) = email_changed {
            tables.emails.remove(&current_email);
            tables.emails.insert(email.clone(), user_id.to_string());
        }

        let record = tables
            .users
            .get_mut(user_id)
            .ok_or(StoreError::NotFound("User"))?;

        if let Some(name) = name {
            record.user.name = name.trim().to_string();
        }

        let mut verification_code = None;
        if let Some(email) = email_changed {
            record.user.email = email;
            record.user.email_verified = false;
            verification_code = Some(verification.code.clone());
            record.verification = Some(verification);
        }
        record.user.updated_at = Utc::now();

        Ok(ProfileUpdate {
            user: record.user.clone(),
            verification_code,
        })
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Params are read back from the PHC string, so hashes made with any
/// configuration verify.
pub fn verify_password_hash(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_verification_code() -> String {
    use rand::Rng;

    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}
