mod common;

use axum::http::{StatusCode, header};
use common::{
    LIVE_PREFIX, SANDBOX_PREFIX, get, login_demo, next_sse_event, open_stream, post, put, send,
    spawn_app,
};
use paydash::environment::Environment;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_get_environment_defaults_to_sandbox() {
    let app = spawn_app().await;

    let response = send(&app.router, get("/api/environment").build()).await;
    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["environment"], "sandbox");
    assert_eq!(data["network"], "testnet");
    assert!(data["base_url"].as_str().unwrap().ends_with(SANDBOX_PREFIX));
}

#[tokio::test]
async fn test_switching_requires_session() {
    let app = spawn_app().await;

    let response = send(
        &app.router,
        put("/api/environment")
            .json(json!({ "environment": "live" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = send(&app.router, post("/api/environment/toggle").build()).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.state.environment().current(), Environment::Sandbox);
}

#[tokio::test]
async fn test_set_environment() {
    let app = spawn_app().await;
    let cookie = login_demo(&app).await;

    let response = send(
        &app.router,
        put("/api/environment")
            .cookie(Some(&cookie))
            .json(json!({ "environment": "live" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["data"]["environment"], "live");
    assert_eq!(response.body["data"]["network"], "mainnet");
    assert!(
        response.body["data"]["base_url"]
            .as_str()
            .unwrap()
            .ends_with(LIVE_PREFIX)
    );

    let response = send(&app.router, get("/api/environment").build()).await;
    assert_eq!(response.body["data"]["environment"], "live");

    for bad in [json!({ "environment": "staging" }), json!({})] {
        let response = send(
            &app.router,
            put("/api/environment")
                .cookie(Some(&cookie))
                .json(bad)
                .build(),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    assert_eq!(app.state.environment().current(), Environment::Live);
}

#[tokio::test]
async fn test_toggle_flips_and_notifies() {
    let app = spawn_app().await;
    let cookie = login_demo(&app).await;
    let mut rx = app.state.environment().subscribe();

    let response = send(
        &app.router,
        post("/api/environment/toggle").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["environment"], "live");

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Environment::Live);

    let response = send(
        &app.router,
        post("/api/environment/toggle").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.body["data"]["environment"], "sandbox");
}

#[tokio::test]
async fn test_environment_events_is_event_stream() {
    let app = spawn_app().await;

    // The stream never ends, so only the head is inspected.
    let response = app
        .router
        .clone()
        .oneshot(get("/api/environment/events").build())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}

#[tokio::test]
async fn test_environment_events_report_current_then_changes() {
    let app = spawn_app().await;
    let cookie = login_demo(&app).await;

    let mut events = open_stream(&app.router, get("/api/environment/events").build()).await;

    let event = next_sse_event(&mut events).await;
    assert!(event.contains("event: environment"), "{event}");
    assert!(event.contains("\"environment\":\"sandbox\""), "{event}");
    assert!(event.contains("testnet"), "{event}");

    let response = send(
        &app.router,
        put("/api/environment")
            .cookie(Some(&cookie))
            .json(json!({ "environment": "live" }))
            .build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let event = next_sse_event(&mut events).await;
    assert!(event.contains("\"environment\":\"live\""), "{event}");
    assert!(event.contains("mainnet"), "{event}");

    let response = send(
        &app.router,
        post("/api/environment/toggle").cookie(Some(&cookie)).build(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let event = next_sse_event(&mut events).await;
    assert!(event.contains("\"environment\":\"sandbox\""), "{event}");
}

#[tokio::test]
async fn test_health_reports_environment() {
    let app = spawn_app().await;

    let response = send(&app.router, get("/api/health").build()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
    assert_eq!(response.body["data"]["environment"], "sandbox");
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let response = send(
        &app.router,
        get("/api/health").header("x-request-id", "dash-req-7").build(),
    )
    .await;
    assert_eq!(response.headers.get("x-request-id").unwrap(), "dash-req-7");
    assert_eq!(response.headers.get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let app = spawn_app().await;

    let response = send(&app.router, get("/api/metrics").build()).await;
    assert_eq!(response.status, StatusCode::OK);
}
