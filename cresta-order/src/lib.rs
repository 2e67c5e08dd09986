pub mod manager;
pub mod models;
pub mod receipt;

pub use manager::{OrderError, OrderManager};
pub use models::Order;
pub use receipt::Receipt;
