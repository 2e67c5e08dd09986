pub mod manager;
pub mod models;

pub use manager::{HoldError, HoldManager};
pub use models::{BuyerInfo, Hold, HoldStatus};
