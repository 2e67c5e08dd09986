use cresta_api::{
    app,
    metrics::ApiMetrics,
    middleware::resiliency::CircuitBreaker,
    state::{AppState, AuthConfig, Resiliency},
    worker,
};
use cresta_core::{MockGateway, SystemClock};
use cresta_hold::HoldManager;
use cresta_order::OrderManager;
use cresta_registry::UnitRegistry;
use cresta_store::{app_config::Config, EventBus, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cresta_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Cresta API on port {}", config.server.port);

    // Redis Connection
    let redis_client = RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");

    // Unit catalog
    let registry = Arc::new(
        UnitRegistry::from_catalog_file(&config.catalog.units_file)
            .expect("Failed to seed unit catalog"),
    );

    let clock: Arc<dyn cresta_core::Clock> = Arc::new(SystemClock);
    let events = EventBus::new(100);

    let holds = Arc::new(HoldManager::new(
        registry.clone(),
        clock.clone(),
        events.clone(),
        config.business_rules.hold_seconds as i64,
    ));
    let orders = Arc::new(OrderManager::new(
        holds.clone(),
        registry.clone(),
        Arc::new(MockGateway),
        clock.clone(),
        events.clone(),
    ));

    let app_state = AppState {
        registry,
        holds,
        orders,
        events,
        redis: Arc::new(redis_client),
        clock,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules: config.business_rules.clone(),
        resiliency: Resiliency {
            payment_cb: Arc::new(CircuitBreaker::new("payments", 5, Duration::from_secs(30))),
        },
        metrics: ApiMetrics::new(),
    };

    worker::spawn_workers(app_state.clone());

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
