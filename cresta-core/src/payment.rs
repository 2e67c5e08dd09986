use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a payment attempt as reported by the gateway. Wire names are
/// the SCREAMING_SNAKE strings the checkout screen polls for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    RequiresAction,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    /// Terminal statuses are latched: once an order reaches one, later
    /// gateway callbacks must not move it again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::RequiresAction => "REQUIRES_ACTION",
            PaymentStatus::Succeeded => "SUCCEEDED",
            PaymentStatus::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// What the provider hands back when an intent is opened: its own reference
/// (which later webhooks carry) plus an optional client secret the front end
/// feeds to the provider SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayIntent {
    pub reference: String,
    pub client_secret: Option<String>,
    pub status: PaymentStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
    #[error("Gateway rejected the request: {0}")]
    Rejected(String),
}

/// Seam to the payment provider. The engine only ever opens intents here;
/// outcomes arrive asynchronously through the webhook surface.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider name as recorded on orders ("mock", "stripe", ...).
    fn name(&self) -> &str;

    async fn create_intent(
        &self,
        order_id: Uuid,
        amount_minor: i64,
        currency: &str,
    ) -> Result<GatewayIntent, GatewayError>;
}

/// Deterministic in-process gateway. Every intent opens as PENDING and only
/// moves through explicit webhook callbacks, never randomness or timers.
///
/// Intents in XTS (the ISO 4217 code reserved for testing) are refused,
/// which is how the gateway failure path and the circuit breaker get
/// exercised end to end.
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_intent(
        &self,
        order_id: Uuid,
        amount_minor: i64,
        currency: &str,
    ) -> Result<GatewayIntent, GatewayError> {
        if currency == "XTS" {
            return Err(GatewayError::Unavailable(
                "Test currency XTS is always refused".to_string(),
            ));
        }

        tracing::info!(
            "Mock intent opened for order {} ({} {})",
            order_id,
            amount_minor,
            currency
        );

        Ok(GatewayIntent {
            reference: format!("mock_pi_{}", order_id.simple()),
            client_secret: Some(format!("mock_secret_{}", order_id.simple())),
            status: PaymentStatus::Pending,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::RequiresAction.is_terminal());
        assert!(PaymentStatus::Succeeded.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&PaymentStatus::RequiresAction).unwrap();
        assert_eq!(json, "\"REQUIRES_ACTION\"");
        let parsed: PaymentStatus = serde_json::from_str("\"SUCCEEDED\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_mock_gateway_is_deterministic() {
        let gateway = MockGateway;
        let order_id = Uuid::new_v4();

        let intent = gateway.create_intent(order_id, 185_000_000, "EUR").await.unwrap();
        assert_eq!(intent.status, PaymentStatus::Pending);
        assert_eq!(intent.reference, format!("mock_pi_{}", order_id.simple()));
        assert!(intent.client_secret.is_some());

        let replay = gateway.create_intent(order_id, 185_000_000, "EUR").await.unwrap();
        assert_eq!(replay.reference, intent.reference);
    }

    #[tokio::test]
    async fn test_mock_gateway_refuses_test_currency() {
        let gateway = MockGateway;
        let err = gateway
            .create_intent(Uuid::new_v4(), 100, "XTS")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }
}
