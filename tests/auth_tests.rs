mod common;

use axum::http::StatusCode;
use common::{
    SANDBOX_PREFIX, get, login_upstream, post, send, spawn_app, spawn_app_with, test_config,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_requires_fields() {
    let app = spawn_app().await;

    let response = send(
        &app.router,
        post("/api/auth/login").json(json!({ "email": "" })).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "Email is required");

    let response = send(
        &app.router,
        post("/api/auth/login")
            .json(json!({ "email": "ada@example.com" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Password is required");
}

#[tokio::test]
async fn test_login_creates_session_without_tokens() {
    let app = spawn_app().await;

    let response = send(&app.router, get("/api/auth/session").build()).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let cookie = login_upstream(&app, "access-1").await;

    let response = send(
        &app.router,
        get("/api/auth/session").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["id"], "u-1");
    assert_eq!(response.body["data"]["email"], "ada@example.com");
    assert_eq!(response.body["data"]["source"], "upstream");
    assert_eq!(response.body["data"]["environment"], "sandbox");
    assert!(response.body["data"].get("tokens").is_none());
    assert!(!response.body.to_string().contains("access-1"));
}

#[tokio::test]
async fn test_login_rejected_by_upstream() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/login")))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "bad credentials" })),
        )
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        post("/api/auth/login")
            .json(json!({ "email": "ada@example.com", "password": "nope" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "Invalid email or password");
    assert!(response.session_cookie().is_none());
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = spawn_app().await;
    let cookie = login_upstream(&app, "access-1").await;

    let response = send(
        &app.router,
        post("/api/auth/logout").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(
        &app.router,
        get("/api/auth/session").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_replaces_access_token() {
    let app = spawn_app().await;
    let cookie = login_upstream(&app, "access-1").await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/refresh")))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "access_token": "access-2" }
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{SANDBOX_PREFIX}/api-keys")))
        .and(wiremock::matchers::header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        post("/api/auth/refresh").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

    let response = send(
        &app.router,
        get("/api/api-keys").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rejected_refresh_ends_session() {
    let app = spawn_app().await;
    let cookie = login_upstream(&app, "access-1").await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/refresh")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Refresh token expired"
        })))
        .expect(1)
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        get("/api/auth/session").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = send(
        &app.router,
        post("/api/auth/refresh").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["success"], false);

    let response = send(
        &app.router,
        get("/api/auth/session").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_session() {
    let app = spawn_app().await;
    let response = send(&app.router, post("/api/auth/refresh").build()).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_passes_validation_details_through() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/register")))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [
                { "loc": ["body", "password"], "msg": "Password is too weak" }
            ]
        })))
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        post("/api/auth/register")
            .json(json!({ "name": "Ada", "email": "ada@example.com", "password": "x" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["details"][0]["field"], "password");
    assert_eq!(response.body["details"][0]["message"], "Password is too weak");
}

#[tokio::test]
async fn test_register_success_is_created() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/register")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status": "success",
            "data": { "id": "u-9", "email": "ada@example.com" }
        })))
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        post("/api/auth/register")
            .json(json!({ "email": "ada@example.com", "password": "long-enough" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["data"]["id"], "u-9");

    let response = send(
        &app.router,
        post("/api/auth/register")
            .json(json!({ "email": "not-an-email", "password": "long-enough" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_flow_messages() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/forgot-password")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Reset email sent" })),
        )
        .mount(&app.upstream)
        .await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/reset-password")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "Reset token has expired"
        })))
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        post("/api/auth/forgot-password")
            .json(json!({ "email": "ada@example.com" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["message"], "Reset email sent");

    let response = send(
        &app.router,
        post("/api/auth/reset-password")
            .json(json!({ "token": "abc", "password": "new-password" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Reset token has expired");

    let response = send(
        &app.router,
        post("/api/auth/reset-password")
            .json(json!({ "password": "new-password" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Reset token is required");
}

#[tokio::test]
async fn test_verify_email_uses_default_message() {
    let app = spawn_app().await;

    Mock::given(method("POST"))
        .and(path(format!("{SANDBOX_PREFIX}/auth/verify-email")))
        .and(body_json(json!({ "email": "ada@example.com", "code": "123456" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&app.upstream)
        .await;

    let response = send(
        &app.router,
        post("/api/auth/verify-email")
            .json(json!({ "email": "ada@example.com", "code": " 123456 " }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["message"], "Email verified");
}

#[tokio::test]
async fn test_unreachable_upstream_is_generic_500() {
    // Nothing listens on the discard port.
    let upstream = MockServer::start().await;
    let mut config = test_config(&upstream.uri());
    config.upstream.sandbox_url = "http://127.0.0.1:9/api/v1".to_string();
    let app = spawn_app_with(upstream, config).await;

    let response = send(
        &app.router,
        post("/api/auth/login")
            .json(json!({ "email": "ada@example.com", "password": "pw" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], "Element Pay service is unavailable");
}
