use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::config::UpstreamConfig;
use crate::environment::Environment;

const LOGIN: &str = "/auth/login";
const REGISTER: &str = "/auth/register";
const VERIFY_EMAIL: &str = "/auth/verify-email";
const RESEND_VERIFICATION: &str = "/auth/resend-verification";
const FORGOT_PASSWORD: &str = "/auth/forgot-password";
const RESET_PASSWORD: &str = "/auth/reset-password";
const REFRESH_TOKEN: &str = "/auth/refresh";
const API_KEYS: &str = "/api-keys";
const ORDERS: &str = "/orders";
const DASHBOARD_SUMMARY: &str = "/dashboard/summary";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),

    #[error("Request to Element Pay failed: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(Value),
    Text(String),
    /// Declared JSON but did not parse; the raw text is kept for messages.
    Malformed(String),
    Empty,
}

impl UpstreamBody {
    /// Parses a raw body, trusting JSON only when the content type says so.
    #[must_use]
    pub fn parse(content_type: Option<&str>, raw: String) -> Self {
        if raw.trim().is_empty() {
            return Self::Empty;
        }

        let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        if !is_json {
            return Self::Text(raw);
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Self::Json(value),
            Err(e) => {
                debug!("Upstream declared JSON but body did not parse: {e}");
                Self::Malformed(raw)
            }
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) | Self::Malformed(text) => Value::String(text),
            Self::Empty => Value::Null,
        }
    }

    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Element Pay REST client. Every call is a single forward attempt against
/// the base URL of the requested environment.
#[derive(Debug, Clone)]
pub struct ElementPayClient {
    client: Client,
    upstream: UpstreamConfig,
}

impl ElementPayClient {
    #[must_use]
    pub const fn with_shared_client(client: Client, upstream: UpstreamConfig) -> Self {
        Self { client, upstream }
    }

    #[must_use]
    pub fn base_url(&self, environment: Environment) -> &str {
        self.upstream.base_url(environment)
    }

    pub fn endpoint(
        &self,
        environment: Environment,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Url, UpstreamError> {
        let base = self.base_url(environment).trim_end_matches('/');
        let raw = format!("{base}/{}", path.trim_start_matches('/'));

        let mut url = Url::parse(&raw).map_err(|e| UpstreamError::InvalidUrl(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    pub async fn send(
        &self,
        environment: Environment,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = self.endpoint(environment, path, query)?;
        debug!(%environment, %method, path, "Forwarding request to Element Pay");

        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%environment, %method, path, "Element Pay unreachable: {e}");
                metrics::counter!(
                    "upstream_requests_total",
                    "environment" => environment.as_str(),
                    "status" => "network_error"
                )
                .increment(1);
                return Err(e.into());
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let raw = response.text().await?;

        metrics::counter!(
            "upstream_requests_total",
            "environment" => environment.as_str(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);

        if !status.is_success() {
            debug!(%environment, %method, path, status = status.as_u16(), "Element Pay returned an error status");
        }

        Ok(UpstreamResponse {
            status,
            body: UpstreamBody::parse(content_type.as_deref(), raw),
        })
    }

    pub async fn login(
        &self,
        environment: Environment,
        email: &str,
        password: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = json!({ "email": email, "password": password });
        self.send(environment, Method::POST, LOGIN, None, &[], Some(&body))
            .await
    }

    pub async fn register(
        &self,
        environment: Environment,
        body: &Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.send(environment, Method::POST, REGISTER, None, &[], Some(body))
            .await
    }

    pub async fn verify_email(
        &self,
        environment: Environment,
        email: &str,
        code: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = json!({ "email": email, "code": code });
        self.send(environment, Method::POST, VERIFY_EMAIL, None, &[], Some(&body))
            .await
    }

    pub async fn resend_verification(
        &self,
        environment: Environment,
        email: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = json!({ "email": email });
        self.send(
            environment,
            Method::POST,
            RESEND_VERIFICATION,
            None,
            &[],
            Some(&body),
        )
        .await
    }

    pub async fn forgot_password(
        &self,
        environment: Environment,
        email: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = json!({ "email": email });
        self.send(environment, Method::POST, FORGOT_PASSWORD, None, &[], Some(&body))
            .await
    }

    pub async fn reset_password(
        &self,
        environment: Environment,
        token: &str,
        password: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = json!({ "token": token, "password": password });
        self.send(environment, Method::POST, RESET_PASSWORD, None, &[], Some(&body))
            .await
    }

    pub async fn refresh_token(
        &self,
        environment: Environment,
        refresh_token: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let body = json!({ "refresh_token": refresh_token });
        self.send(environment, Method::POST, REFRESH_TOKEN, None, &[], Some(&body))
            .await
    }

    pub async fn list_api_keys(
        &self,
        environment: Environment,
        bearer: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.send(environment, Method::GET, API_KEYS, Some(bearer), &[], None)
            .await
    }

    pub async fn create_api_key(
        &self,
        environment: Environment,
        bearer: &str,
        name: &str,
        network: Option<&str>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut body = json!({ "name": name });
        if let Some(network) = network {
            body["environment"] = Value::String(network.to_string());
        }
        self.send(environment, Method::POST, API_KEYS, Some(bearer), &[], Some(&body))
            .await
    }

    pub async fn delete_api_key(
        &self,
        environment: Environment,
        bearer: &str,
        key_id: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let path = format!("{API_KEYS}/{key_id}");
        self.send(environment, Method::DELETE, &path, Some(bearer), &[], None)
            .await
    }

    pub async fn list_orders(
        &self,
        environment: Environment,
        bearer: &str,
        query: &[(&str, String)],
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.send(environment, Method::GET, ORDERS, Some(bearer), query, None)
            .await
    }

    pub async fn get_order(
        &self,
        environment: Environment,
        bearer: &str,
        order_id: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let path = format!("{ORDERS}/{order_id}");
        self.send(environment, Method::GET, &path, Some(bearer), &[], None)
            .await
    }

    pub async fn dashboard_summary(
        &self,
        environment: Environment,
        bearer: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.send(environment, Method::GET, DASHBOARD_SUMMARY, Some(bearer), &[], None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ElementPayClient {
        let upstream = UpstreamConfig {
            sandbox_url: "https://sandbox.example.test/api/v1/".to_string(),
            live_url: "https://live.example.test/api/v1".to_string(),
            ..UpstreamConfig::default()
        };
        ElementPayClient::with_shared_client(Client::new(), upstream)
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = client();

        let url = client.endpoint(Environment::Sandbox, "/orders", &[]).unwrap();
        assert_eq!(url.as_str(), "https://sandbox.example.test/api/v1/orders");

        let url = client
            .endpoint(
                Environment::Live,
                "orders",
                &[("page", "2".to_string()), ("status", "pending".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://live.example.test/api/v1/orders?page=2&status=pending"
        );
    }

    #[test]
    fn test_body_parsing_follows_content_type() {
        assert_eq!(
            UpstreamBody::parse(Some("application/json; charset=utf-8"), r#"{"ok":true}"#.into()),
            UpstreamBody::Json(json!({"ok": true}))
        );
        assert_eq!(
            UpstreamBody::parse(Some("text/html"), r#"{"ok":true}"#.into()),
            UpstreamBody::Text(r#"{"ok":true}"#.into())
        );
        assert_eq!(
            UpstreamBody::parse(Some("application/json"), "<html>oops</html>".into()),
            UpstreamBody::Malformed("<html>oops</html>".into())
        );
        assert_eq!(UpstreamBody::parse(None, "  ".into()), UpstreamBody::Empty);
    }
}
