use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::{MockStore, StoreError};
use crate::environment::Network;

#[derive(Debug, Clone, Serialize)]
pub struct ApiKey {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub environment: Network,
    pub key: String,
    pub created_at: DateTime<Utc>,
}

impl MockStore {
    pub async fn create_api_key(
        &self,
        user_id: &str,
        name: &str,
        network: Network,
    ) -> Result<ApiKey, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(user_id) {
            return Err(StoreError::NotFound("User"));
        }

        let api_key = ApiKey {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name: name.trim().to_string(),
            environment: network,
            key: generate_key_material(network),
            created_at: Utc::now(),
        };
        tables.api_keys.insert(api_key.id.clone(), api_key.clone());

        debug!(user_id, key_id = %api_key.id, %network, "Issued demo API key");
        Ok(api_key)
    }

    /// Keys owned by `user_id`, newest first.
    pub async fn list_api_keys(&self, user_id: &str) -> Vec<ApiKey> {
        let tables = self.tables.read().await;
        let mut keys: Vec<ApiKey> = tables
            .api_keys
            .values()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        keys
    }

    /// Replaces the key material, keeping id, name and environment.
    pub async fn regenerate_api_key(&self, user_id: &str, key_id: &str) -> Result<ApiKey, StoreError> {
        let mut tables = self.tables.write().await;
        let api_key = tables
            .api_keys
            .get_mut(key_id)
            .ok_or(StoreError::NotFound("API key"))?;

        if api_key.user_id != user_id {
            return Err(StoreError::NotOwner);
        }

        api_key.key = generate_key_material(api_key.environment);
        Ok(api_key.clone())
    }

    pub async fn delete_api_key(&self, user_id: &str, key_id: &str) -> Result<ApiKey, StoreError> {
        let mut tables = self.tables.write().await;
        let owner = tables
            .api_keys
            .get(key_id)
            .map(|k| k.user_id.clone())
            .ok_or(StoreError::NotFound("API key"))?;

        if owner != user_id {
            return Err(StoreError::NotOwner);
        }

        tables
            .api_keys
            .remove(key_id)
            .ok_or(StoreError::NotFound("API key"))
    }
}

/// Random key material: `ep_live_` or `ep_test_` followed by 64 hex chars.
#[must_use]
pub fn generate_key_material(network: Network) -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    let prefix = match network {
        Network::Mainnet => "ep_live_",
        Network::Testnet => "ep_test_",
    };

    bytes
        .iter()
        .fold(String::with_capacity(prefix.len() + 64), |mut acc, b| {
            use std::fmt::Write;
            if acc.is_empty() {
                acc.push_str(prefix);
            }
            let _ = write!(acc, "{b:02x}");
            acc
        })
}
