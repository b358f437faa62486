use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::order::{self, OrderStatus};
use crate::entities::transition_log::{self, FlowType};
use crate::errors::ServiceError;
use crate::services::completion::CompletionStatus;
use crate::services::orders::{CreateOrderRequest, OrderBoard, OrderListPage};
use crate::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<order::Model>), ServiceError> {
    let order = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<order::Model>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(order))
}

pub async fn order_board(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderBoard>, ServiceError> {
    let board = state.services.orders.order_board(id).await?;
    Ok(Json(board))
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListPage>, ServiceError> {
    let page = state
        .services
        .orders
        .list_orders(query.status, query.page, query.per_page)
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct TransitionsQuery {
    pub flow_type: Option<FlowType>,
}

pub async fn list_transitions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<TransitionsQuery>,
) -> Result<Json<Vec<transition_log::Model>>, ServiceError> {
    let entries = state.services.audit.for_order(id, query.flow_type).await?;
    Ok(Json(entries))
}

pub async fn completion_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompletionStatus>, ServiceError> {
    let status = state.services.completion.completion_status(id).await?;
    Ok(Json(status))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<order::Model>, ServiceError> {
    let order = state
        .services
        .orders
        .record_payment(id, request.amount)
        .await?;
    Ok(Json(order))
}
