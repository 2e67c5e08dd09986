use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// JWT claims for a storefront session. Guest sessions carry a generated
/// subject; the role string is reserved for a future agent console.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// What protected handlers actually receive: one explicit context object
/// instead of every handler re-decoding the token.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub role: String,
}

pub async fn session_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract the bearer token
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        AppError::AuthenticationError("Missing bearer token".to_string())
    })?;

    // 2. Decode and validate the session JWT
    let token_data = decode::<SessionClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid or expired token".to_string()))?;

    // 3. Hand handlers an explicit session context
    req.extensions_mut().insert(SessionContext {
        user_id: token_data.claims.sub,
        role: token_data.claims.role,
    });

    Ok(next.run(req).await)
}
