//! Frontend shapes built from Element Pay payloads.
//!
//! Upstream field naming is inconsistent between endpoints (snake_case,
//! camelCase, alternative names), so these are read field by field from
//! `serde_json::Value` instead of derived.

use serde::Serialize;
use serde_json::Value;

use crate::clients::envelope::scalar_to_string;

/// First non-null member among `keys`.
fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys)
        .filter(|v| v.is_string() || v.is_number())
        .map(scalar_to_string)
        .filter(|s| !s.is_empty())
}

fn f64_field(value: &Value, keys: &[&str]) -> Option<f64> {
    match field(value, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn u64_field(value: &Value, keys: &[&str]) -> Option<u64> {
    match field(value, keys)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The list inside a payload: either the payload itself or the first array
/// found under one of `keys`.
fn list<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    if let Value::Array(items) = value {
        return items;
    }
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .map_or(&[][..], Vec::as_slice)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamUser {
    pub id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPayload {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: UpstreamUser,
}

impl LoginPayload {
    const ACCESS: &'static [&'static str] = &["access_token", "accessToken", "token"];
    const REFRESH: &'static [&'static str] = &["refresh_token", "refreshToken"];

    /// Reads tokens from the payload root or a nested `tokens` object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let token_source = value.get("tokens").filter(|t| t.is_object()).unwrap_or(value);

        let access_token = string_field(token_source, Self::ACCESS)
            .or_else(|| string_field(value, Self::ACCESS))?;
        let refresh_token = string_field(token_source, Self::REFRESH)
            .or_else(|| string_field(value, Self::REFRESH));

        let user_source = value.get("user").filter(|u| u.is_object()).unwrap_or(value);
        let user = UpstreamUser {
            id: string_field(user_source, &["id", "user_id", "userId", "_id"]),
            email: string_field(user_source, &["email"]),
            name: string_field(user_source, &["name", "full_name", "fullName", "username"]),
        };

        Some(Self {
            access_token,
            refresh_token,
            user,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyDto {
    pub id: String,
    pub name: String,
    pub environment: Option<String>,
    /// Full key material; upstream only returns it on creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub preview: Option<String>,
    pub created_at: Option<String>,
    pub last_used_at: Option<String>,
}

impl ApiKeyDto {
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = string_field(value, &["id", "key_id", "keyId", "_id"])?;
        let key = string_field(value, &["api_key", "apiKey", "key", "secret"]);
        let preview = string_field(value, &["preview", "key_preview", "prefix", "masked_key"])
            .or_else(|| key.as_deref().map(mask_key));

        Some(Self {
            id,
            name: string_field(value, &["name", "label"]).unwrap_or_default(),
            environment: string_field(value, &["environment", "network", "mode"]),
            key,
            preview,
            created_at: string_field(value, &["created_at", "createdAt"]),
            last_used_at: string_field(value, &["last_used_at", "lastUsedAt"]),
        })
    }

    #[must_use]
    pub fn list_from_value(value: &Value) -> Vec<Self> {
        list(value, &["api_keys", "apiKeys", "keys", "items", "results"])
            .iter()
            .filter_map(Self::from_value)
            .collect()
    }
}

/// Shortens key material for display: `ep_live_ab12…9f3c`.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOutcome {
    Pending,
    Completed,
    Failed,
}

impl OrderOutcome {
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "completed" | "complete" | "settled" | "success" | "successful" | "paid"
            | "fulfilled" => Self::Completed,
            "failed" | "cancelled" | "canceled" | "refunded" | "expired" | "rejected" => {
                Self::Failed
            }
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDto {
    pub id: String,
    pub status: String,
    pub order_type: Option<String>,
    pub amount_fiat: Option<f64>,
    pub amount_crypto: Option<f64>,
    pub currency: Option<String>,
    pub token: Option<String>,
    pub wallet_address: Option<String>,
    pub transaction_hash: Option<String>,
    pub created_at: Option<String>,
}

impl OrderDto {
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = string_field(value, &["order_id", "orderId", "id", "_id"])?;

        Some(Self {
            id,
            status: string_field(value, &["status", "order_status", "state"])
                .map_or_else(|| "unknown".to_string(), |s| s.to_ascii_lowercase()),
            order_type: string_field(value, &["order_type", "orderType", "type"]),
            amount_fiat: f64_field(value, &["amount_fiat", "fiat_amount", "fiatAmount", "amount"]),
            amount_crypto: f64_field(
                value,
                &["amount_crypto", "crypto_amount", "cryptoAmount", "token_amount"],
            ),
            currency: string_field(value, &["currency", "fiat_currency", "fiatCurrency"]),
            token: string_field(value, &["token", "token_symbol", "tokenSymbol", "asset"]),
            wallet_address: string_field(value, &["wallet_address", "walletAddress", "wallet"]),
            transaction_hash: string_field(
                value,
                &["transaction_hash", "transactionHash", "tx_hash", "txHash"],
            ),
            created_at: string_field(value, &["created_at", "createdAt"]),
        })
    }

    #[must_use]
    pub fn outcome(&self) -> OrderOutcome {
        OrderOutcome::from_status(&self.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<OrderDto>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

impl OrderPage {
    /// Accepts a bare list or a paged object. `page`/`limit` fall back to the
    /// values that were requested.
    #[must_use]
    pub fn from_value(value: &Value, requested_page: u64, requested_limit: u64) -> Self {
        let orders: Vec<OrderDto> = list(value, &["orders", "items", "results", "data"])
            .iter()
            .filter_map(OrderDto::from_value)
            .collect();

        let total = u64_field(value, &["total", "count", "total_count", "totalCount"])
            .unwrap_or(orders.len() as u64);

        Self {
            total,
            page: u64_field(value, &["page", "current_page", "currentPage"]).unwrap_or(requested_page),
            limit: u64_field(value, &["limit", "per_page", "perPage", "page_size"])
                .unwrap_or(requested_limit),
            orders,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_orders: u64,
    pub completed_orders: u64,
    pub pending_orders: u64,
    pub failed_orders: u64,
    pub total_volume: f64,
    pub currency: Option<String>,
    pub recent_orders: Vec<OrderDto>,
}

impl DashboardSummary {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let stats = value.get("stats").filter(|s| s.is_object()).unwrap_or(value);

        Self {
            total_orders: u64_field(stats, &["total_orders", "totalOrders", "orders"]).unwrap_or(0),
            completed_orders: u64_field(
                stats,
                &["completed_orders", "completedOrders", "successful_orders"],
            )
            .unwrap_or(0),
            pending_orders: u64_field(stats, &["pending_orders", "pendingOrders"]).unwrap_or(0),
            failed_orders: u64_field(stats, &["failed_orders", "failedOrders"]).unwrap_or(0),
            total_volume: f64_field(stats, &["total_volume", "totalVolume", "volume"])
                .unwrap_or(0.0),
            currency: string_field(stats, &["currency", "fiat_currency"]),
            recent_orders: value
                .get("recent_orders")
                .or_else(|| value.get("recentOrders"))
                .map(|recent| list(recent, &[]).iter().filter_map(OrderDto::from_value).collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_payload_shapes() {
        let flat = json!({
            "access_token": "acc",
            "refresh_token": "ref",
            "user": {"id": 42, "email": "a@b.co", "full_name": "Ada"}
        });
        let login = LoginPayload::from_value(&flat).unwrap();
        assert_eq!(login.access_token, "acc");
        assert_eq!(login.refresh_token.as_deref(), Some("ref"));
        assert_eq!(login.user.id.as_deref(), Some("42"));
        assert_eq!(login.user.name.as_deref(), Some("Ada"));

        let nested = json!({"tokens": {"accessToken": "acc2"}, "email": "x@y.z"});
        let login = LoginPayload::from_value(&nested).unwrap();
        assert_eq!(login.access_token, "acc2");
        assert_eq!(login.user.email.as_deref(), Some("x@y.z"));

        assert!(LoginPayload::from_value(&json!({"user": {}})).is_none());
    }

    #[test]
    fn test_api_key_list_and_masking() {
        let payload = json!({"api_keys": [
            {"id": "k1", "name": "Shop", "api_key": "ep_live_0123456789abcdef", "createdAt": "2026-01-01"},
            {"name": "no id"}
        ]});
        let keys = ApiKeyDto::list_from_value(&payload);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].preview.as_deref(), Some("ep_live_…cdef"));
        assert_eq!(keys[0].created_at.as_deref(), Some("2026-01-01"));
        assert_eq!(mask_key("short"), "*****");
    }

    #[test]
    fn test_order_page_from_list_and_object() {
        let bare = json!([{"id": 1, "status": "PENDING", "amount": "100.5"}]);
        let page = OrderPage::from_value(&bare, 1, 20);
        assert_eq!(page.total, 1);
        assert_eq!(page.orders[0].status, "pending");
        assert_eq!(page.orders[0].amount_fiat, Some(100.5));

        let paged = json!({"orders": [{"order_id": "o-1", "status": "settled"}], "total": 57, "page": 3});
        let page = OrderPage::from_value(&paged, 1, 20);
        assert_eq!(page.total, 57);
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 20);
        assert_eq!(page.orders[0].outcome(), OrderOutcome::Completed);
    }

    #[test]
    fn test_dashboard_summary_defaults() {
        let summary = DashboardSummary::from_value(&json!({
            "stats": {"totalOrders": 10, "completedOrders": 7, "volume": "1500.25"},
            "recent_orders": [{"id": "a", "status": "failed"}]
        }));
        assert_eq!(summary.total_orders, 10);
        assert_eq!(summary.completed_orders, 7);
        assert_eq!(summary.pending_orders, 0);
        assert!((summary.total_volume - 1500.25).abs() < f64::EPSILON);
        assert_eq!(summary.recent_orders[0].outcome(), OrderOutcome::Failed);
    }
}
