//! Shared helpers for the HTTP integration tests.
//!
//! Every test gets its own router, state and `wiremock` server standing in for
//! Element Pay. The sandbox and live base URLs point at different prefixes of
//! the same mock server so tests can tell which environment was hit.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use paydash::api::AppState;
use paydash::config::Config;
use paydash::constants::{DEMO_USER_EMAIL, DEMO_USER_PASSWORD};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SANDBOX_PREFIX: &str = "/sandbox/api/v1";
pub const LIVE_PREFIX: &str = "/live/api/v1";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub upstream: MockServer,
}

pub fn test_config(upstream_uri: &str) -> Config {
    let mut config = Config::default();
    config.upstream.sandbox_url = format!("{upstream_uri}{SANDBOX_PREFIX}");
    config.upstream.live_url = format!("{upstream_uri}{LIVE_PREFIX}");
    config.upstream.request_timeout_seconds = 5;
    config.environment.preference_path = String::new();
    config.server.secure_cookies = false;
    config.general.seed_demo_user = true;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app() -> TestApp {
    let upstream = MockServer::start().await;
    let config = test_config(&upstream.uri());
    spawn_app_with(upstream, config).await
}

pub async fn spawn_app_with(upstream: MockServer, config: Config) -> TestApp {
    let state = paydash::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let router = paydash::api::router(state.clone());

    TestApp {
        router,
        state,
        upstream,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` pair of the session cookie, if one was set.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.split(';').next().map(str::to_string))
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Opens a streaming endpoint and hands back its unread body.
pub async fn open_stream(app: &Router, request: Request<Body>) -> Body {
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.into_body()
}

/// Reads the next server-sent event carrying data, failing after five seconds.
pub async fn next_sse_event(body: &mut Body) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("stream errored");
        let Ok(data) = frame.into_data() else {
            continue;
        };
        let text = String::from_utf8_lossy(&data).into_owned();
        if text.contains("data:") {
            return text;
        }
    }
}

pub struct RequestBuilder {
    inner: axum::http::request::Builder,
    body: Option<Value>,
}

impl RequestBuilder {
    pub fn new(method: &str, uri: &str) -> Self {
        Self {
            inner: Request::builder().method(method).uri(uri),
            body: None,
        }
    }

    pub fn cookie(mut self, cookie: Option<&str>) -> Self {
        if let Some(cookie) = cookie {
            self.inner = self.inner.header(header::COOKIE, cookie);
        }
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.inner = self
            .inner
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Request<Body> {
        match self.body {
            Some(body) => self
                .inner
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => self.inner.body(Body::empty()).unwrap(),
        }
    }
}

pub fn get(uri: &str) -> RequestBuilder {
    RequestBuilder::new("GET", uri)
}

pub fn post(uri: &str) -> RequestBuilder {
    RequestBuilder::new("POST", uri)
}

pub fn put(uri: &str) -> RequestBuilder {
    RequestBuilder::new("PUT", uri)
}

pub fn delete(uri: &str) -> RequestBuilder {
    RequestBuilder::new("DELETE", uri)
}

/// Logs the seeded demo user in against the local store.
pub async fn login_demo(app: &TestApp) -> String {
    let response = send(
        &app.router,
        post("/api/account/login")
            .json(json!({ "email": DEMO_USER_EMAIL, "password": DEMO_USER_PASSWORD }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.session_cookie().expect("login should set a cookie")
}

/// Mounts a successful sandbox login and logs in through it.
pub async fn login_upstream(app: &TestApp, access_token: &str) -> String {
    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/login")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "access_token": access_token,
                "refresh_token": "refresh-1",
                "user": { "id": "u-1", "email": "ada@example.com", "name": "Ada" }
            }
        })))
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        post("/api/auth/login")
            .json(json!({ "email": "ada@example.com", "password": "correct-horse" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.session_cookie().expect("login should set a cookie")
}
