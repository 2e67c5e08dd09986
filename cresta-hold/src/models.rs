use chrono::{DateTime, Duration, Utc};
use cresta_shared::Masked;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a hold. `active` is the only non-terminal state; once a
/// hold leaves it there is no way back in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HoldStatus {
    Active,
    Confirmed,
    Released,
    Expired,
}

impl HoldStatus {
    pub fn is_terminal(&self) -> bool {
        *self != HoldStatus::Active
    }
}

impl fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HoldStatus::Active => "active",
            HoldStatus::Confirmed => "confirmed",
            HoldStatus::Released => "released",
            HoldStatus::Expired => "expired",
        };
        write!(f, "{}", name)
    }
}

/// Buyer details collected during the reservation flow. Contact fields stay
/// masked in Debug output so they cannot leak through tracing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuyerInfo {
    pub full_name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    pub nationality: Option<String>,
    pub note: Option<String>,
}

/// An exclusive, time-bounded claim on one unit by one user.
///
/// Holds are never deleted: terminal transitions flip `status` and leave the
/// record behind, so a client polling a hold it lost can still learn what
/// happened to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub user_id: String,
    pub status: HoldStatus,
    pub review_confirmed: bool,
    pub buyer: Option<BuyerInfo>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn new(unit_id: Uuid, user_id: &str, now: DateTime<Utc>, hold_seconds: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            user_id: user_id.to_string(),
            status: HoldStatus::Active,
            review_confirmed: false,
            buyer: None,
            created_at: now,
            expires_at: now + Duration::seconds(hold_seconds),
        }
    }

    /// Past its window. At exactly `expires_at` the hold is still good.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_milliseconds().max(0)
    }
}
