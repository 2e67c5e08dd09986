use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cresta_hold::HoldError;
use cresta_order::OrderError;
use serde_json::json;

/// Request-scoped failures mapped onto the wire taxonomy. Every body is
/// `{"error": <message>, "code": <machine code>}`; `ALREADY_HELD` also
/// carries `remainingMs` so the front end can show the countdown on the
/// competing hold.
#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    AlreadyHeld { remaining_ms: i64 },
    UnitNotAvailable(String),
    HoldExpired(String),
    NotActive(String),
    Conflict(String),
    ServiceUnavailable(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    /// Collapse hold-manager failures onto the wire taxonomy.
    pub fn from_hold(err: HoldError) -> Self {
        match err {
            HoldError::UnitNotFound(id) => AppError::NotFoundError(format!("Unit not found: {}", id)),
            HoldError::NotFound(id) => {
                AppError::NotFoundError(format!("Reservation not found: {}", id))
            }
            HoldError::AlreadyHeld { remaining_ms } => AppError::AlreadyHeld { remaining_ms },
            HoldError::UnitNotAvailable { status } => {
                AppError::UnitNotAvailable(format!("Unit is {}", status))
            }
            HoldError::Expired => {
                AppError::HoldExpired("Hold has expired, lock the unit again".to_string())
            }
            HoldError::NotActive { status } => AppError::NotActive(format!("Hold is {}", status)),
            HoldError::Conflict => {
                AppError::Conflict("State moved concurrently, retry".to_string())
            }
        }
    }

    /// Collapse order-manager failures onto the wire taxonomy.
    pub fn from_order(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => AppError::NotFoundError(format!("Order not found: {}", id)),
            OrderError::ReceiptNotFound(id) => {
                AppError::NotFoundError(format!("Receipt not found: {}", id))
            }
            OrderError::HoldNotFound(id) => {
                AppError::NotFoundError(format!("Reservation not found: {}", id))
            }
            OrderError::HoldExpired => {
                AppError::HoldExpired("Hold is no longer active, lock the unit again".to_string())
            }
            OrderError::InFlight { .. } => AppError::Conflict(
                "A payment attempt is already in flight for this hold".to_string(),
            ),
            OrderError::Conflict => {
                AppError::Conflict("State moved concurrently, retry".to_string())
            }
            OrderError::Gateway(msg) => AppError::ServiceUnavailable(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match &self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "VALIDATION", msg.clone()),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::AlreadyHeld { remaining_ms } => (
                StatusCode::CONFLICT,
                "ALREADY_HELD",
                format!("Unit already held, {} ms remaining", remaining_ms),
            ),
            AppError::UnitNotAvailable(msg) => (StatusCode::CONFLICT, "UNIT_NOT_AVAILABLE", msg.clone()),
            AppError::HoldExpired(msg) => (StatusCode::GONE, "HOLD_EXPIRED", msg.clone()),
            AppError::NotActive(msg) => (StatusCode::CONFLICT, "NOT_ACTIVE", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "GATEWAY_UNAVAILABLE", msg.clone())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "Internal Server Error".to_string(),
                )
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": error_message,
            "code": code,
        });
        if let AppError::AlreadyHeld { remaining_ms } = &self {
            body["remainingMs"] = json!(remaining_ms);
        }

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
