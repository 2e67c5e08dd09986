pub mod auth;
pub mod resiliency;
