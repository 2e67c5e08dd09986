use crate::{error::AppError, middleware::auth::SessionContext, state::AppState};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use cresta_hold::{BuyerInfo, Hold, HoldError, HoldStatus};
use cresta_shared::Masked;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockRequest {
    unit_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuyerRequest {
    full_name: String,
    email: String,
    phone: String,
    nationality: Option<String>,
    note: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub user_id: String,
    pub status: HoldStatus,
    pub review_confirmed: bool,
    pub buyer: Option<BuyerInfo>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub remaining_ms: i64,
}

impl ReservationResponse {
    pub fn from_hold(hold: Hold, now: DateTime<Utc>) -> Self {
        let remaining_ms = if hold.status == HoldStatus::Active {
            hold.remaining_ms(now)
        } else {
            0
        };
        Self {
            id: hold.id,
            unit_id: hold.unit_id,
            user_id: hold.user_id,
            status: hold.status,
            review_confirmed: hold.review_confirmed,
            buyer: hold.buyer,
            created_at: hold.created_at,
            expires_at: hold.expires_at,
            remaining_ms,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LockResponse {
    #[serde(flatten)]
    reservation: ReservationResponse,
    hold_seconds: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reservations/lock", post(lock_unit))
        .route("/reservations/{id}", axum::routing::get(get_reservation))
        .route("/reservations/{id}/buyer", patch(update_buyer))
        .route("/reservations/{id}/confirm-review", patch(confirm_review))
        .route("/reservations/{id}/renew", post(renew_reservation))
        .route("/reservations/{id}/release", post(release_reservation))
}

async fn lock_unit(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
    Json(req): Json<LockRequest>,
) -> Result<Json<LockResponse>, AppError> {
    // 1. The idempotency key is the retry contract; refuse requests without one
    let key = idempotency_key(&headers)?;

    // 2. Acquire (or replay) the hold
    let hold = state.holds.lock(req.unit_id, &session.user_id, key).map_err(|e| {
        if matches!(e, HoldError::AlreadyHeld { .. }) {
            state.metrics.lock_conflicts.inc();
        }
        AppError::from_hold(e)
    })?;
    state.metrics.locks.inc();

    info!(
        "Reservation {} locked unit {} for {}",
        hold.id, hold.unit_id, session.user_id
    );
    Ok(Json(LockResponse {
        reservation: ReservationResponse::from_hold(hold, state.clock.now()),
        hold_seconds: state.business_rules.hold_seconds,
    }))
}

async fn get_reservation(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let hold = owned_hold(&state, &session, id)?;
    Ok(Json(ReservationResponse::from_hold(hold, state.clock.now())))
}

async fn update_buyer(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<BuyerRequest>,
) -> Result<Json<ReservationResponse>, AppError> {
    // 1. Light validation; the sales back office cleans the rest up later
    if req.full_name.trim().is_empty() {
        return Err(AppError::ValidationError("fullName must not be empty".to_string()));
    }
    if !req.email.contains('@') {
        return Err(AppError::ValidationError("email looks invalid".to_string()));
    }
    if req.phone.trim().is_empty() {
        return Err(AppError::ValidationError("phone must not be empty".to_string()));
    }

    // 2. Verify ownership
    owned_hold(&state, &session, id)?;

    // 3. Attach the details to the live hold
    let buyer = BuyerInfo {
        full_name: req.full_name,
        email: Masked::new(req.email),
        phone: Masked::new(req.phone),
        nationality: req.nationality,
        note: req.note,
    };
    let hold = state
        .holds
        .update_buyer(id, buyer)
        .map_err(AppError::from_hold)?;

    Ok(Json(ReservationResponse::from_hold(hold, state.clock.now())))
}

async fn confirm_review(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    owned_hold(&state, &session, id)?;
    let hold = state
        .holds
        .confirm_review(id)
        .map_err(AppError::from_hold)?;
    Ok(Json(ReservationResponse::from_hold(hold, state.clock.now())))
}

async fn renew_reservation(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    owned_hold(&state, &session, id)?;
    let hold = state.holds.renew(id).map_err(AppError::from_hold)?;
    Ok(Json(ReservationResponse::from_hold(hold, state.clock.now())))
}

async fn release_reservation(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let before = owned_hold(&state, &session, id)?;
    let hold = state.holds.release(id).map_err(AppError::from_hold)?;
    if before.status == HoldStatus::Active && hold.status == HoldStatus::Released {
        state.metrics.releases.inc();
    }

    info!("Reservation {} released by {}", id, session.user_id);
    Ok(Json(ReservationResponse::from_hold(hold, state.clock.now())))
}

/// Shared owner guard: loads the hold (settling lazy expiry) and rejects
/// anyone but the user who placed it.
pub fn owned_hold(
    state: &AppState,
    session: &SessionContext,
    hold_id: Uuid,
) -> Result<Hold, AppError> {
    let hold = state.holds.get(hold_id).map_err(AppError::from_hold)?;
    if hold.user_id != session.user_id {
        return Err(AppError::AuthorizationError(
            "Reservation does not belong to you".to_string(),
        ));
    }
    Ok(hold)
}

/// Pull the required `Idempotency-Key` header off a mutating request.
pub fn idempotency_key(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            AppError::ValidationError("Missing Idempotency-Key header".to_string())
        })
}
