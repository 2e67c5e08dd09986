use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kinds broadcast over the realtime channel. Wire names are the
/// snake_case strings the front end switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeEventKind {
    UnitHeld,
    UnitSold,
    UnitReleased,
    HoldTick,
    HoldExtend,
    PaymentUpdate,
}

/// Envelope delivered to every subscriber: `{type, timestamp, data}`.
/// Timestamp is milliseconds since epoch so countdown UIs never have to
/// trust their local clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: RealtimeEventKind,
    pub timestamp: i64,
    pub data: serde_json::Value,
}

impl RealtimeEvent {
    pub fn new<T: Serialize>(kind: RealtimeEventKind, at: DateTime<Utc>, data: T) -> Self {
        Self {
            kind,
            timestamp: at.timestamp_millis(),
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitHeldPayload {
    pub unit_id: Uuid,
    pub hold_id: Uuid,
    pub expires_at: i64,
    pub remaining_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSoldPayload {
    pub unit_id: Uuid,
    pub hold_id: Uuid,
    pub order_id: Uuid,
}

/// Why a unit went back to the pool. `Expired` comes from the lazy check or
/// the sweep worker, `Released` from a voluntary cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    Released,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitReleasedPayload {
    pub unit_id: Uuid,
    pub hold_id: Uuid,
    pub reason: ReleaseReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldTickPayload {
    pub hold_id: Uuid,
    pub unit_id: Uuid,
    pub remaining_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldExtendPayload {
    pub hold_id: Uuid,
    pub unit_id: Uuid,
    pub expires_at: i64,
    pub remaining_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdatePayload {
    pub order_id: Uuid,
    pub hold_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<Uuid>,
}

/// Channel naming shared by publishers and the WebSocket subscribe protocol.
pub fn unit_channel(unit_id: Uuid) -> String {
    format!("unit:{}", unit_id)
}

pub fn reservation_channel(hold_id: Uuid) -> String {
    format!("reservation:{}", hold_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let at = Utc::now();
        let event = RealtimeEvent::new(
            RealtimeEventKind::HoldTick,
            at,
            HoldTickPayload {
                hold_id: Uuid::new_v4(),
                unit_id: Uuid::new_v4(),
                remaining_ms: 599_000,
            },
        );

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "hold_tick");
        assert_eq!(json["timestamp"], at.timestamp_millis());
        assert_eq!(json["data"]["remainingMs"], 599_000);
    }

    #[test]
    fn test_release_reason_names() {
        assert_eq!(
            serde_json::to_string(&ReleaseReason::Expired).unwrap(),
            "\"expired\""
        );
    }
}
