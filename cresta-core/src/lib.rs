pub mod clock;
pub mod payment;

pub use clock::{Clock, ManualClock, SystemClock};
pub use payment::{GatewayError, GatewayIntent, MockGateway, PaymentGateway, PaymentStatus};
