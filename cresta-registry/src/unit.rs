use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Availability of a sellable unit. Lowercase on the wire.
///
/// `held` and `sold` are only ever entered through the registry
/// compare-and-swap; `unavailable` marks units withdrawn from sale
/// administratively (show units, legal disputes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Available,
    Held,
    Sold,
    Unavailable,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitStatus::Available => "available",
            UnitStatus::Held => "held",
            UnitStatus::Sold => "sold",
            UnitStatus::Unavailable => "unavailable",
        };
        write!(f, "{}", name)
    }
}

/// Unit types offered across the development.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Villa,
    Townhouse,
    Penthouse,
    Apartment,
}

/// A sellable unit. Catalog attributes are immutable after seeding; only
/// `status` ever changes, and only through `UnitRegistry::try_set_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: Uuid,
    pub code: String,
    pub unit_type: UnitType,
    pub floor: i32,
    pub price_minor: i64,
    pub currency: String,
    pub area_sqm: f64,
    pub orientation: String,
    #[serde(default = "default_status")]
    pub status: UnitStatus,
}

fn default_status() -> UnitStatus {
    UnitStatus::Available
}
