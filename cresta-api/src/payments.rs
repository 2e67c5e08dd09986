use crate::{
    error::AppError,
    middleware::auth::SessionContext,
    reservations::{idempotency_key, owned_hold},
    state::AppState,
};
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use cresta_core::PaymentStatus;
use cresta_order::{Order, OrderError};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePaymentRequest {
    hold_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusQuery {
    order_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub hold_id: Uuid,
    pub unit_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub gateway: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            hold_id: order.hold_id,
            unit_id: order.unit_id,
            amount_minor: order.amount_minor,
            currency: order.currency,
            gateway: order.gateway,
            status: order.status,
            reason: order.reason,
            receipt_id: order.receipt_id,
            client_secret: order.client_secret,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// The polling shape: nothing but the outcome fields, cheap to serve every
/// few seconds for two minutes straight.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    order_id: Uuid,
    status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/create", post(create_payment))
        .route("/payments/status", get(payment_status))
}

async fn create_payment(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    // 1. The idempotency key is the retry contract; refuse requests without one
    let key = idempotency_key(&headers)?;

    // 2. A replayed key already has its outcome recorded; answer from the
    //    store without consulting the breaker or re-entering the gateway
    if let Some(order) = state.orders.find_by_idempotency_key(key) {
        owned_hold(&state, &session, order.hold_id)?;
        return Ok(Json(order.into()));
    }

    // 3. Ownership check; the amount comes from the catalog, never the client
    let hold = owned_hold(&state, &session, req.hold_id)?;
    let unit = state
        .registry
        .get(&hold.unit_id)
        .ok_or_else(|| AppError::NotFoundError(format!("Unit not found: {}", hold.unit_id)))?;

    // 4. Fail fast while the provider circuit is open
    if !state.resiliency.payment_cb.check().await {
        return Err(AppError::ServiceUnavailable(
            "Payment provider temporarily unavailable, try again shortly".to_string(),
        ));
    }

    // 5. Open the payment attempt. Only a provider outcome may move the
    //    breaker; anything that fails before the gateway call hands its
    //    probe slot back so a half-open circuit cannot wedge.
    let gateway = state.orders.gateway_name().to_string();
    let result = state
        .orders
        .create_order(req.hold_id, unit.price_minor, &unit.currency, &gateway, key)
        .await;

    match result {
        Ok(order) => {
            state.resiliency.payment_cb.record_success().await;
            info!(
                "Payment attempt {} opened for reservation {} by {}",
                order.id, req.hold_id, session.user_id
            );
            Ok(Json(order.into()))
        }
        Err(OrderError::Gateway(msg)) => {
            state.resiliency.payment_cb.record_failure().await;
            Err(AppError::from_order(OrderError::Gateway(msg)))
        }
        Err(e) => {
            state.resiliency.payment_cb.release_probe();
            Err(AppError::from_order(e))
        }
    }
}

async fn payment_status(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, AppError> {
    let order = state
        .orders
        .get(query.order_id)
        .map_err(AppError::from_order)?;
    owned_hold(&state, &session, order.hold_id)?;

    Ok(Json(StatusResponse {
        order_id: order.id,
        status: order.status,
        reason: order.reason,
        receipt_id: order.receipt_id,
    }))
}
