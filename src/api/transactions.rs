use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tracing::warn;

use super::extract::{ActiveEnvironment, CurrentUser, UpstreamAuth};
use super::validation::validate_identifier;
use super::{ApiError, ApiResponse, AppState};
use crate::models::{PendingTransaction, TrackTransactionRequest};

/// GET /transactions/pending
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Json<ApiResponse<Vec<PendingTransaction>>> {
    Json(ApiResponse::success(state.transactions().list(&user.id).await))
}

/// POST /transactions/pending
pub async fn track_transaction(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    CurrentUser(user): CurrentUser,
    auth: UpstreamAuth,
    Json(payload): Json<TrackTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PendingTransaction>>), ApiError> {
    // The order id ends up in the upstream URL path.
    if !payload.order_id.trim().is_empty() {
        validate_identifier(payload.order_id.trim(), "order id")?;
    }

    let transaction = state
        .transactions()
        .track(&user.id, environment, &auth.token, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(transaction))))
}

/// DELETE /transactions/pending/{hash}
pub async fn cancel_transaction(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(hash): Path<String>,
) -> Result<Json<ApiResponse<PendingTransaction>>, ApiError> {
    let transaction = state.transactions().cancel(&user.id, &hash).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

/// GET /transactions/events
/// Updates for the session user's transactions only.
pub async fn transaction_events(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.transactions().subscribe();
    let owner = user.id;

    let stream = stream::unfold((rx, owner), |(mut rx, owner)| async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.owner == owner => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    return Some((Ok(Event::default().event("transaction").data(json)), (rx, owner)));
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Client lagged by {} messages", count);

                    return Some((
                        Ok(Event::default().event("warning").data("Missed some events")),
                        (rx, owner),
                    ));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
