//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{AccountingRecord, CustomerId, Order, OrderId, PaymentStatus};
use serde::{Deserialize, Serialize};
use workflow::{
    InMemoryCustomerRepository, InMemoryProductRepository, OrderLine, OrderWorkflowService,
    PaymentRequest, PaymentResult, PaymentType,
};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub workflow: OrderWorkflowService,
    pub customers: InMemoryCustomerRepository,
    pub products: InMemoryProductRepository,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize, Default)]
pub struct FinalizeRequest {
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Deserialize)]
pub struct PaymentBody {
    pub payment_method_id: u32,
    #[serde(default)]
    pub card_reference: Option<String>,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub payment_type: PaymentType,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub gross_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub allowed_actions: Vec<&'static str>,
    pub payments: Vec<PaymentSummary>,
    pub accounting: Option<AccountingRecord>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct PaymentSummary {
    pub payment_id: String,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
}

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub warnings: Vec<String>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            customer_id: order
                .customer_id()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            status: order.status().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                    total_cents: item.total_price().cents(),
                })
                .collect(),
            gross_cents: order.gross_total().cents(),
            discount_cents: order.discount().cents(),
            total_cents: order.total_amount().cents(),
            allowed_actions: order.allowed_actions().iter().map(|a| a.as_str()).collect(),
            payments: order
                .payments()
                .iter()
                .map(|p| PaymentSummary {
                    payment_id: p.id.to_string(),
                    amount_cents: p.amount.cents(),
                    status: p.status,
                    transaction_id: p.transaction_id.clone(),
                })
                .collect(),
            accounting: order.accounting().cloned(),
        }
    }
}

// -- Handlers --

/// POST /orders: snapshot catalog products into a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let customer_id: CustomerId = req
        .customer_id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer_id: {e}")))?;

    let lines = req
        .items
        .into_iter()
        .map(|item| OrderLine {
            product_id: item.product_id.into(),
            quantity: item.quantity,
        })
        .collect();

    let (order, validation) = state.workflow.create_order(customer_id, lines).await?;

    let response = OrderCreatedResponse {
        order: OrderResponse::from(&order),
        warnings: validation.warnings,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /orders/:id
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.workflow.get_order(parse_order_id(&id)?).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/finalize: apply discounts and await payment.
#[tracing::instrument(skip(state, req))]
pub async fn finalize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<FinalizeRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .workflow
        .finalize_order(parse_order_id(&id)?, req.coupon_code.as_deref())
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/payments
///
/// Declined and invalid payments answer 402 with the same body.
#[tracing::instrument(skip(state, req))]
pub async fn pay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PaymentBody>,
) -> Result<(StatusCode, Json<PaymentResult>), ApiError> {
    let request = PaymentRequest {
        payment_method_id: req.payment_method_id,
        card_reference: req.card_reference,
        installments: req.installments,
        payment_type: req.payment_type,
    };

    let result = state
        .workflow
        .make_payment(parse_order_id(&id)?, request)
        .await?;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::PAYMENT_REQUIRED
    };
    Ok((status, Json(result)))
}

/// POST /orders/:id/cancel
#[tracing::instrument(skip(state, req))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .workflow
        .cancel_order(parse_order_id(&id)?, &req.reason)
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
