use axum::{
    extract::State,
    http::Method,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod payments;
pub mod receipts;
pub mod reservations;
pub mod state;
pub mod units;
pub mod webhooks;
pub mod worker;
pub mod ws;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static("idempotency-key"),
        ]);

    // Everything touching a reservation, order, or receipt sits behind the
    // session middleware; the catalog, webhook, and realtime surfaces do not.
    let protected = Router::new()
        .merge(reservations::routes())
        .merge(payments::routes())
        .merge(receipts::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_auth_middleware,
        ));

    Router::new()
        .merge(auth::routes())
        .merge(units::routes())
        .merge(webhooks::routes())
        .merge(ws::routes())
        .route("/metrics", get(metrics_handler))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    // No peer address means no connect info was installed (tests); fail open
    let Some(addr) = req
        .extensions()
        .get::<axum::extract::ConnectInfo<SocketAddr>>()
        .map(|info| info.0)
    else {
        return Ok(next.run(req).await);
    };
    let key = format!("ratelimit:{}", addr.ip());

    match state.redis.check_rate_limit(&key, 100, 60).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((
            axum::http::StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded",
        )),
        Err(_) => Ok(next.run(req).await), // Fail open
    }
}
