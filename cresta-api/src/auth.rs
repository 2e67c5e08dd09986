use crate::{error::AppError, middleware::auth::SessionClaims, state::AppState};
use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    expires_in: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/guest", post(guest_session))
}

/// Anonymous session bootstrap: the storefront calls this once per visitor
/// and sends the token on every protected request after it.
async fn guest_session(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let claims = SessionClaims {
        sub: format!("guest-{}", Uuid::new_v4()),
        role: "GUEST".to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok(Json(AuthResponse {
        token,
        expires_in: state.auth.expiration,
    }))
}
