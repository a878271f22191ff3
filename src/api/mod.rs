use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::clients::ElementPayClient;
use crate::config::Config;
use crate::environment::EnvironmentManager;
use crate::services::TransactionTracker;
use crate::state::SharedState;
use crate::store::MockStore;

mod account;
mod api_keys;
pub mod auth;
mod demo_keys;
mod environment;
mod error;
pub mod extract;
mod health;
mod observability;
mod orders;
pub mod proxy;
mod transactions;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<Config> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &MockStore {
        &self.shared.store
    }

    #[must_use]
    pub fn environment(&self) -> &EnvironmentManager {
        &self.shared.environment
    }

    #[must_use]
    pub fn element_pay(&self) -> &Arc<ElementPayClient> {
        &self.shared.element_pay
    }

    #[must_use]
    pub fn transactions(&self) -> &TransactionTracker {
        &self.shared.transactions
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config().server;
    let cors_origins = server.cors_allowed_origins.clone();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_ttl_minutes,
        )));

    let api_router = Router::new()
        .merge(create_session_router())
        .route("/health", get(health::health))
        .route("/metrics", get(observability::get_metrics))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::get_session))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route(
            "/auth/resend-verification",
            post(auth::resend_verification),
        )
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/account/signup", post(account::signup))
        .route("/account/verify", post(account::verify))
        .route("/account/resend-code", post(account::resend_code))
        .route("/account/login", post(account::login))
        .route(
            "/environment",
            get(environment::get_environment).put(environment::set_environment),
        )
        .route("/environment/toggle", post(environment::toggle_environment))
        .route("/environment/events", get(environment::environment_events))
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api-keys/{id}", delete(api_keys::delete_api_key))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/dashboard/summary", get(orders::dashboard_summary))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        // Session cookies need credentialed CORS, which rules out wildcards.
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

/// Routes that need a logged-in session user.
fn create_session_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/account/profile",
            get(account::get_profile).put(account::update_profile),
        )
        .route(
            "/demo/api-keys",
            get(demo_keys::list_keys).post(demo_keys::create_key),
        )
        .route(
            "/demo/api-keys/{id}/regenerate",
            post(demo_keys::regenerate_key),
        )
        .route("/demo/api-keys/{id}", delete(demo_keys::delete_key))
        .route(
            "/transactions/pending",
            get(transactions::list_pending).post(transactions::track_transaction),
        )
        .route(
            "/transactions/pending/{hash}",
            delete(transactions::cancel_transaction),
        )
        .route("/transactions/events", get(transactions::transaction_events))
        .route_layer(middleware::from_fn(auth::require_session))
}
