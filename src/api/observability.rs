//! Request logging, metrics and response hardening for the dashboard API.
//!
//! Every request runs inside a `request` span and ends with one
//! `request_completed` event carrying everything needed to answer "what did
//! this call do": route, status, latency, the environment override and the
//! session user once [`super::auth::require_session`] has recorded it.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::api::AppState;
use crate::constants::{ENVIRONMENT_HEADER, REQUEST_ID_HEADER};

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "# metrics recorder is not installed\n".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// Coarse result of a request as the dashboard sees it.
fn outcome(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "failed"
    } else if status.is_client_error() {
        "rejected"
    } else {
        "ok"
    }
}

/// Metric label for a request path. Identifier segments collapse to `:id`
/// and unknown routes to `unmatched` so label values stay bounded.
fn route_label(path: &str, status: StatusCode) -> String {
    if status == StatusCode::NOT_FOUND {
        return "unmatched".to_string();
    }

    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.chars().all(|c| c.is_ascii_lowercase() || c == '-') {
                segment
            } else {
                ":id"
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

/// Reuses a caller supplied request id when it is short and printable.
fn request_id(req: &Request) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= 64
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = request_id(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let environment_override = req
        .headers()
        .get(ENVIRONMENT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let span = info_span!(
        "request",
        %request_id,
        %method,
        %path,
        environment = environment_override.as_deref(),
        user_id = tracing::field::Empty,
    );

    async move {
        let mut response = next.run(req).await;
        let status = response.status();
        let elapsed = started.elapsed();

        let labels = [
            ("method", method.to_string()),
            ("route", route_label(&path, status)),
            ("status", status.as_u16().to_string()),
        ];
        metrics::counter!("paydash_http_requests_total", &labels).increment(1);
        metrics::histogram!("paydash_http_request_seconds", &labels)
            .record(elapsed.as_secs_f64());

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }

        info!(
            event = "request_completed",
            status = status.as_u16(),
            outcome = outcome(status),
            latency_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "{method} {path} -> {}",
            status.as_u16()
        );

        response
    }
    .instrument(span)
    .await
}

/// The API only serves JSON and event streams, so nothing may frame or sniff it.
const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'",
    ),
];

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}
