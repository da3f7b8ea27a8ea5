//! Order endpoints: create, read, list and status changes.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderNumber, ProductId};
use domain::{Order, OrderLine, OrderStatus, PlaceOrder};
use fulfillment::OrderCoordinator;
use inventory::StockLedger;
use order_store::{OrderQuery, OrderRepository};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<L: StockLedger, R: OrderRepository> {
    pub coordinator: OrderCoordinator<L, R>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub shipping_address: String,
    pub lines: Vec<OrderLineRequest>,
    #[serde(default)]
    pub discount_cents: i64,
}

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ListOrdersParams {
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub customer_id: String,
    pub customer_name: String,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub payment_status: String,
    pub lines: Vec<OrderLineResponse>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub version: i64,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub id: String,
    pub product_id: i64,
    pub sku: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub total_price_cents: i64,
    pub tax_cents: i64,
    pub final_price_cents: i64,
    pub status: String,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.id.to_string(),
            product_id: line.product_id.as_i64(),
            sku: line.sku.clone(),
            name: line.name.clone(),
            unit_price_cents: line.unit_price.cents(),
            quantity: line.quantity,
            total_price_cents: line.total_price.cents(),
            tax_cents: line.tax_amount.cents(),
            final_price_cents: line.final_price.cents(),
            status: line.status.as_str().to_string(),
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            order_number: order.order_number().to_string(),
            customer_id: order.customer_id().to_string(),
            customer_name: order.customer_name().to_string(),
            shipping_address: order.shipping_address().to_string(),
            status: order.status(),
            payment_status: order.payment_status().as_str().to_string(),
            lines: order.lines().iter().map(OrderLineResponse::from).collect(),
            subtotal_cents: order.subtotal().cents(),
            tax_cents: order.tax_amount().cents(),
            shipping_cents: order.shipping_amount().cents(),
            discount_cents: order.discount_amount().cents(),
            total_cents: order.total_amount().cents(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            expected_delivery_date: order.expected_delivery_date(),
            actual_delivery_date: order.actual_delivery_date(),
            version: order.version().as_i64(),
        }
    }
}

// -- Handlers --

/// POST /orders: validate, reserve stock and persist a confirmed order.
#[tracing::instrument(skip(state, req))]
pub async fn create<L, R>(
    State(state): State<Arc<AppState<L, R>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let customer_id = match req.customer_id.as_deref() {
        Some(raw) => CustomerId::from_uuid(parse_uuid(raw, "customer_id")?),
        None => CustomerId::new(),
    };

    let request = req
        .lines
        .iter()
        .fold(
            PlaceOrder::new(customer_id, req.customer_name, req.shipping_address),
            |cmd, line| cmd.with_line(ProductId::new(line.product_id), line.quantity),
        )
        .with_discount(Money::from_cents(req.discount_cents));

    let order = state.coordinator.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders/{id}: load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<L, R>(
    State(state): State<Arc<AppState<L, R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.coordinator.get_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /orders: list orders, newest first, optionally filtered.
#[tracing::instrument(skip(state, params))]
pub async fn list<L, R>(
    State(state): State<Arc<AppState<L, R>>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let mut query = OrderQuery::new();
    if let Some(raw) = params.customer_id.as_deref() {
        query.customer_id = Some(CustomerId::from_uuid(parse_uuid(raw, "customer_id")?));
    }
    if let Some(raw) = params.status.as_deref() {
        query = query.with_status(parse_status(raw)?);
    }
    query.limit = params.limit;
    query.offset = params.offset;

    let orders = state.coordinator.list_orders(query).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/by-number/{order_number}: load an order by its order number.
#[tracing::instrument(skip(state))]
pub async fn get_by_number<L, R>(
    State(state): State<Arc<AppState<L, R>>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let order_number = OrderNumber::parse(number.as_str())
        .map_err(|e| ApiError::BadRequest(format!("Invalid order number: {e}")))?;
    let order = state
        .coordinator
        .get_order_by_number(&order_number)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {number} not found")))?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/status: move an order to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<L, R>(
    State(state): State<Arc<AppState<L, R>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let order_id = parse_order_id(&id)?;
    let status = parse_status(&req.status)?;
    let order = state
        .coordinator
        .update_order_status(order_id, status)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel: cancel an order that has not shipped.
#[tracing::instrument(skip(state))]
pub async fn cancel<L, R>(
    State(state): State<Arc<AppState<L, R>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: StockLedger + 'static,
    R: OrderRepository + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.coordinator.cancel_order(order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn parse_uuid(raw: &str, field: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    parse_uuid(raw, "order id").map(OrderId::from_uuid)
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse()
        .map_err(|e: domain::UnknownStatus| ApiError::BadRequest(e.to_string()))
}
