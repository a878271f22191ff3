use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tracing::info;

use super::extract::CurrentUser;
use super::{ApiError, ApiResponse, AppState, EnvironmentDto, SetEnvironmentRequest};
use crate::config::Config;
use crate::environment::Environment;

fn describe(config: &Config, environment: Environment) -> EnvironmentDto {
    EnvironmentDto {
        environment,
        base_url: config.upstream.base_url(environment).to_string(),
        network: environment.network().to_string(),
    }
}

/// GET /environment
pub async fn get_environment(State(state): State<Arc<AppState>>) -> Json<ApiResponse<EnvironmentDto>> {
    let current = state.environment().current();
    Json(ApiResponse::success(describe(state.config(), current)))
}

/// PUT /environment
pub async fn set_environment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SetEnvironmentRequest>,
) -> Result<Json<ApiResponse<EnvironmentDto>>, ApiError> {
    if payload.environment.trim().is_empty() {
        return Err(ApiError::validation("Environment is required"));
    }
    let environment = payload
        .environment
        .parse::<Environment>()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    if state.environment().set(environment) {
        info!(user_id = %user.id, %environment, "Environment switched");
    }

    Ok(Json(ApiResponse::success(describe(state.config(), environment))))
}

/// POST /environment/toggle
pub async fn toggle_environment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<EnvironmentDto>> {
    let environment = state.environment().toggle();
    info!(user_id = %user.id, %environment, "Environment toggled");
    Json(ApiResponse::success(describe(state.config(), environment)))
}

/// GET /environment/events
/// Emits the current environment, then every change.
pub async fn environment_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.environment().subscribe();
    let config = Arc::clone(state.config());

    let stream = stream::unfold((rx, config, true), |(mut rx, config, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }

        let environment = *rx.borrow_and_update();
        let json = serde_json::to_string(&describe(&config, environment)).unwrap_or_default();
        Some((
            Ok(Event::default().event("environment").data(json)),
            (rx, config, false),
        ))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
