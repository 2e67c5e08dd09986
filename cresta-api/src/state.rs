use crate::metrics::ApiMetrics;
use crate::middleware::resiliency::CircuitBreaker;
use cresta_core::Clock;
use cresta_hold::HoldManager;
use cresta_order::OrderManager;
use cresta_registry::UnitRegistry;
use cresta_store::{app_config::BusinessRules, EventBus, RedisClient};
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct Resiliency {
    pub payment_cb: Arc<CircuitBreaker>,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<UnitRegistry>,
    pub holds: Arc<HoldManager>,
    pub orders: Arc<OrderManager>,
    pub events: EventBus,
    pub redis: Arc<RedisClient>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub resiliency: Resiliency,
    pub metrics: ApiMetrics,
}
