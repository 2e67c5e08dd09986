pub mod app_config;
pub mod events;
pub mod redis_repo;

pub use events::EventBus;
pub use redis_repo::RedisClient;
