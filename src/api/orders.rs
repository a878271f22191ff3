use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::extract::{ActiveEnvironment, UpstreamAuth};
use super::validation::{validate_identifier, validate_limit, validate_page};
use super::{ApiError, ApiResponse, AppState, proxy};
use crate::constants::DEFAULT_ORDER_PAGE_SIZE;
use crate::models::{DashboardSummary, OrderDto, OrderPage};

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

/// GET /orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    auth: UpstreamAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<ApiResponse<OrderPage>>, ApiError> {
    let page = validate_page(query.page.unwrap_or(1))?;
    let limit = validate_limit(query.limit.unwrap_or(DEFAULT_ORDER_PAGE_SIZE))?;

    let mut params = vec![("page", page.to_string()), ("limit", limit.to_string())];
    if let Some(status) = query.status.as_deref().map(str::trim)
        && !status.is_empty()
    {
        params.push(("status", status.to_ascii_lowercase()));
    }

    let response = state
        .element_pay()
        .list_orders(environment, &auth.token, &params)
        .await?;
    let payload = proxy::into_payload(response)?;

    Ok(Json(ApiResponse::success(OrderPage::from_value(
        &payload,
        u64::from(page),
        u64::from(limit),
    ))))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    auth: UpstreamAuth,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<OrderDto>>, ApiError> {
    let id = validate_identifier(&id, "order id")?;

    let response = state
        .element_pay()
        .get_order(environment, &auth.token, id)
        .await?;
    let payload = proxy::into_payload(response)?;
    let payload = payload.get("order").cloned().unwrap_or(payload);

    let order = OrderDto::from_value(&payload).ok_or_else(|| ApiError::not_found("Order", id))?;

    Ok(Json(ApiResponse::success(order)))
}

/// GET /dashboard/summary
pub async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
    ActiveEnvironment(environment): ActiveEnvironment,
    auth: UpstreamAuth,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let response = state
        .element_pay()
        .dashboard_summary(environment, &auth.token)
        .await?;
    let payload = proxy::into_payload(response)?;

    Ok(Json(ApiResponse::success(DashboardSummary::from_value(
        &payload,
    ))))
}
