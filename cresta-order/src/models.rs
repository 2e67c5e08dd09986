use chrono::{DateTime, Utc};
use cresta_core::PaymentStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A payment attempt, correlated to exactly one hold.
///
/// An order starts `PENDING` the moment it is recorded and only moves
/// through gateway callbacks. Terminal statuses are latched; `reason` and
/// `receipt_id` carry the outcome once one is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub hold_id: Uuid,
    pub unit_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub gateway: String,
    pub status: PaymentStatus,
    pub reason: Option<String>,
    pub receipt_id: Option<Uuid>,
    pub gateway_ref: Option<String>,
    pub client_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        hold_id: Uuid,
        unit_id: Uuid,
        amount_minor: i64,
        currency: &str,
        gateway: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hold_id,
            unit_id,
            amount_minor,
            currency: currency.to_string(),
            gateway: gateway.to_string(),
            status: PaymentStatus::Pending,
            reason: None,
            receipt_id: None,
            gateway_ref: None,
            client_secret: None,
            created_at: now,
            updated_at: now,
        }
    }
}
