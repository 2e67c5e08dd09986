use crate::{error::AppError, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use cresta_core::PaymentStatus;
use serde::Deserialize;
use tracing::info;

/// Callback body from the provider: its own intent reference, the status it
/// settled on, and an optional decline reason.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayCallback {
    pub reference: String,
    pub status: PaymentStatus,
    pub reason: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/payments/{gateway}", post(payment_callback))
}

/// Gateway callback ingestion. Delivery is at-least-once and unordered, so
/// the whole handler has to be replay-safe: the correlator latches terminal
/// statuses, and metrics only move on an actual transition.
async fn payment_callback(
    State(state): State<AppState>,
    Path(gateway): Path<String>,
    Json(callback): Json<GatewayCallback>,
) -> Result<StatusCode, AppError> {
    info!(
        "Webhook from {}: {} -> {}",
        gateway, callback.reference, callback.status
    );

    // 1. Resolve the provider reference to our order
    let order = state
        .orders
        .find_by_reference(&callback.reference)
        .ok_or_else(|| {
            AppError::NotFoundError(format!("Unknown payment reference: {}", callback.reference))
        })?;
    let was_terminal = order.status.is_terminal();

    // 2. Apply; replays onto a settled order come back unchanged
    let updated = state
        .orders
        .apply_gateway_status(order.id, callback.status, callback.reason)
        .map_err(AppError::from_order)?;

    if !was_terminal {
        match updated.status {
            PaymentStatus::Succeeded => state.metrics.sales.inc(),
            PaymentStatus::Failed => state.metrics.failed_payments.inc(),
            _ => {}
        }
    }

    Ok(StatusCode::OK)
}
