//! Order lifecycle endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{Context, OrderId, UserId};
use domain::{Order, PartId, PaymentMethod};
use messaging::InMemoryBroker;
use order_store::OrderStore;
use orchestrator::{InMemoryCatalogClient, InMemoryPaymentClient, OrderOrchestrator};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Orchestrator as wired by the server.
pub type AppOrchestrator = OrderOrchestrator<
    Arc<dyn OrderStore>,
    InMemoryCatalogClient,
    InMemoryPaymentClient,
    InMemoryBroker,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: Arc<AppOrchestrator>,
    pub request_timeout: Duration,
    pub store_backend: &'static str,
}

impl AppState {
    fn request_context(&self) -> Context {
        Context::with_timeout(self.request_timeout)
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub part_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct PayOrderRequest {
    pub payment_method: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub total_price_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub user_id: String,
    pub part_ids: Vec<String>,
    pub total_price_cents: i64,
    pub status: String,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id.to_string(),
            user_id: order.owner_id.to_string(),
            part_ids: order
                .line_item_ids
                .iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            total_price_cents: order.total_price.cents(),
            status: order.status.as_str().to_string(),
            payment_method: order.payment_method().map(|m| m.as_str().to_string()),
            transaction_id: order.transaction_id().map(|tx| tx.as_str().to_string()),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct PayOrderResponse {
    pub transaction_id: String,
}

// -- Handlers --

/// POST /api/v1/orders: create an order from catalog parts.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let user_id = UserId::parse_str(&req.user_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;
    let part_ids = req.part_ids.into_iter().map(PartId::new).collect();

    let created = state
        .orchestrator
        .create_order(&state.request_context(), user_id, part_ids)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_id: created.order_id.to_string(),
            total_price_cents: created.total_price.cents(),
        }),
    ))
}

/// GET /api/v1/orders/{id}: load an order.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orchestrator
        .get_order(&state.request_context(), order_id)
        .await?;
    Ok(Json(order.into()))
}

/// POST /api/v1/orders/{id}/pay: pay for an order.
#[tracing::instrument(skip(state, req))]
pub async fn pay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PayOrderRequest>,
) -> Result<Json<PayOrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let method: PaymentMethod = req
        .payment_method
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let transaction_id = state
        .orchestrator
        .pay_order(&state.request_context(), order_id, method)
        .await?;

    Ok(Json(PayOrderResponse {
        transaction_id: transaction_id.as_str().to_string(),
    }))
}

/// POST /api/v1/orders/{id}/cancel: cancel an unpaid order.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let order_id = parse_order_id(&id)?;
    state
        .orchestrator
        .cancel_order(&state.request_context(), order_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse_str(id).map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}
