use crate::models::Order;
use crate::receipt::{generate_receipt_number, Receipt};
use chrono::{DateTime, Utc};
use cresta_core::{Clock, PaymentGateway, PaymentStatus};
use cresta_hold::{HoldError, HoldManager, HoldStatus};
use cresta_registry::UnitRegistry;
use cresta_shared::models::events::{
    reservation_channel, PaymentUpdatePayload, RealtimeEvent, RealtimeEventKind,
};
use cresta_store::EventBus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct OrderState {
    orders: HashMap<Uuid, Order>,
    receipts: HashMap<Uuid, Receipt>,
    /// order idempotency key -> order created for it.
    idempotency: HashMap<String, Uuid>,
    /// hold -> its single non-terminal order.
    in_flight: HashMap<Uuid, Uuid>,
    /// gateway intent reference -> order, for webhook resolution.
    by_reference: HashMap<String, Uuid>,
}

/// Correlates payment attempts to holds and ingests gateway callbacks.
///
/// A hold carries at most one non-terminal order at a time, and terminal
/// order statuses are latched, so at-least-once webhook delivery (replays,
/// reordering, duplicates) cannot double-sell a unit or flip a settled
/// outcome. Lock order across the workspace is orders, then holds, then the
/// registry; nothing takes them the other way around.
pub struct OrderManager {
    holds: Arc<HoldManager>,
    registry: Arc<UnitRegistry>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    inner: Mutex<OrderState>,
}

impl OrderManager {
    pub fn new(
        holds: Arc<HoldManager>,
        registry: Arc<UnitRegistry>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            holds,
            registry,
            gateway,
            clock,
            events,
            inner: Mutex::new(OrderState::default()),
        }
    }

    /// Open a payment attempt against a live hold.
    ///
    /// Replaying an idempotency key returns the stored order in whatever
    /// state it has since reached: a double-submitted checkout must never
    /// open two charge attempts, and a retry after a crash must learn the
    /// original outcome rather than start over.
    pub async fn create_order(
        &self,
        hold_id: Uuid,
        amount_minor: i64,
        currency: &str,
        gateway: &str,
        idempotency_key: &str,
    ) -> Result<Order, OrderError> {
        let now = self.clock.now();

        // 1. Replay check before anything else, so a retry observes the
        //    original outcome even if the hold has lapsed in between.
        {
            let state = self.state();
            if let Some(order) = state
                .idempotency
                .get(idempotency_key)
                .and_then(|id| state.orders.get(id))
            {
                debug!("Idempotent order replay for {}", order.id);
                return Ok(order.clone());
            }
        }

        // 2. The hold must still be live; this read settles lazy expiry.
        let hold = self
            .holds
            .get(hold_id)
            .map_err(|_| OrderError::HoldNotFound(hold_id))?;
        if hold.status != HoldStatus::Active {
            return Err(OrderError::HoldExpired);
        }

        // 3. Claim the hold's single in-flight slot and record the order
        //    before talking to the provider, so a racing duplicate sees it.
        let order = {
            let mut state = self.state();
            if let Some(order) = state
                .idempotency
                .get(idempotency_key)
                .and_then(|id| state.orders.get(id))
            {
                // lost the race to an identical retry between the two locks
                return Ok(order.clone());
            }
            if let Some(in_flight) = state.in_flight.get(&hold_id).copied() {
                return Err(OrderError::InFlight { order_id: in_flight });
            }

            let order = Order::new(hold_id, hold.unit_id, amount_minor, currency, gateway, now);
            state.in_flight.insert(hold_id, order.id);
            state.idempotency.insert(idempotency_key.to_string(), order.id);
            state.orders.insert(order.id, order.clone());
            order
        };

        // 4. Open the intent. The lock is not held across this await.
        match self
            .gateway
            .create_intent(order.id, amount_minor, currency)
            .await
        {
            Ok(intent) => {
                let snapshot = {
                    let mut state = self.state();
                    state.by_reference.insert(intent.reference.clone(), order.id);
                    let stored = state
                        .orders
                        .get_mut(&order.id)
                        .ok_or(OrderError::NotFound(order.id))?;
                    stored.gateway_ref = Some(intent.reference);
                    stored.client_secret = intent.client_secret;
                    stored.updated_at = self.clock.now();
                    stored.clone()
                };
                info!(
                    "Order {} opened against hold {} ({} {})",
                    snapshot.id, hold_id, amount_minor, currency
                );
                self.publish_update(&snapshot);
                Ok(snapshot)
            }
            Err(e) => {
                let snapshot = {
                    let mut state = self.state();
                    Self::finish(
                        &mut state,
                        order.id,
                        PaymentStatus::Failed,
                        Some("GATEWAY_ERROR".to_string()),
                        None,
                        self.clock.now(),
                    )?
                };
                warn!("Gateway refused intent for order {}: {}", snapshot.id, e);
                self.publish_update(&snapshot);
                Err(OrderError::Gateway(e.to_string()))
            }
        }
    }

    /// Ingest a gateway callback. Terminal statuses are latched: anything
    /// arriving after `SUCCEEDED` or `FAILED` is acknowledged and ignored,
    /// since webhook delivery is at-least-once and unordered.
    pub fn apply_gateway_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
        reason: Option<String>,
    ) -> Result<Order, OrderError> {
        let now = self.clock.now();
        let mut state = self.state();

        let current = state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderError::NotFound(order_id))?;
        if current.status.is_terminal() {
            debug!("Order {} already {}, callback ignored", order_id, current.status);
            return Ok(current);
        }

        let snapshot = match status {
            PaymentStatus::Succeeded => self.settle_success(&mut state, &current, now)?,
            PaymentStatus::Failed => {
                Self::finish(&mut state, order_id, PaymentStatus::Failed, reason, None, now)?
            }
            status => {
                let stored = state
                    .orders
                    .get_mut(&order_id)
                    .ok_or(OrderError::NotFound(order_id))?;
                stored.status = status;
                stored.reason = reason;
                stored.updated_at = now;
                stored.clone()
            }
        };
        drop(state);

        self.publish_update(&snapshot);
        Ok(snapshot)
    }

    /// Read an order for status polling. Settles the owning hold's lazy
    /// expiry on the way, so the unit side stays honest while a client does
    /// nothing but poll.
    pub fn get(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let hold_id = {
            let state = self.state();
            state
                .orders
                .get(&order_id)
                .ok_or(OrderError::NotFound(order_id))?
                .hold_id
        };
        let _ = self.holds.get(hold_id);

        let state = self.state();
        state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(OrderError::NotFound(order_id))
    }

    /// Provider name new orders are opened against.
    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// The order an idempotency key was already spent on, if any. Lets the
    /// HTTP layer answer a replay without re-entering the create path.
    pub fn find_by_idempotency_key(&self, key: &str) -> Option<Order> {
        let state = self.state();
        state
            .idempotency
            .get(key)
            .and_then(|id| state.orders.get(id))
            .cloned()
    }

    /// Resolve a gateway intent reference to its order, for webhooks.
    pub fn find_by_reference(&self, reference: &str) -> Option<Order> {
        let state = self.state();
        state
            .by_reference
            .get(reference)
            .and_then(|id| state.orders.get(id))
            .cloned()
    }

    pub fn receipt(&self, receipt_id: Uuid) -> Result<Receipt, OrderError> {
        self.state()
            .receipts
            .get(&receipt_id)
            .cloned()
            .ok_or(OrderError::ReceiptNotFound(receipt_id))
    }

    /// The success path: promote the hold to a sale, then issue the receipt
    /// and latch the order, all under the order lock so the webhook caller
    /// sees one atomic outcome.
    fn settle_success(
        &self,
        state: &mut OrderState,
        current: &Order,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        match self.holds.confirm_sale(current.hold_id, current.id) {
            Ok(hold) => {
                let unit_code = self
                    .registry
                    .get(&current.unit_id)
                    .map(|u| u.code)
                    .unwrap_or_default();
                let receipt = Receipt {
                    id: Uuid::new_v4(),
                    number: generate_receipt_number(now),
                    order_id: current.id,
                    hold_id: current.hold_id,
                    unit_id: current.unit_id,
                    unit_code,
                    buyer_name: hold.buyer.map(|b| b.full_name),
                    amount_minor: current.amount_minor,
                    currency: current.currency.clone(),
                    issued_at: now,
                };
                let receipt_id = receipt.id;
                state.receipts.insert(receipt.id, receipt);

                let snapshot = Self::finish(
                    state,
                    current.id,
                    PaymentStatus::Succeeded,
                    None,
                    Some(receipt_id),
                    now,
                )?;
                info!("Order {} succeeded, receipt {} issued", snapshot.id, receipt_id);
                Ok(snapshot)
            }
            Err(HoldError::Expired) | Err(HoldError::NotActive { .. }) => {
                // The money cleared after the window closed. The order fails
                // with the reason; any refund is the gateway's to run.
                warn!(
                    "Order {} succeeded after hold {} lapsed",
                    current.id, current.hold_id
                );
                Self::finish(
                    state,
                    current.id,
                    PaymentStatus::Failed,
                    Some("HOLD_EXPIRED".to_string()),
                    None,
                    now,
                )
            }
            Err(HoldError::NotFound(_)) => Err(OrderError::HoldNotFound(current.hold_id)),
            Err(e) => {
                warn!("Sale confirmation for order {} hit {}", current.id, e);
                Err(OrderError::Conflict)
            }
        }
    }

    /// Move a non-terminal order into a terminal status and free the hold's
    /// in-flight slot.
    fn finish(
        state: &mut OrderState,
        order_id: Uuid,
        status: PaymentStatus,
        reason: Option<String>,
        receipt_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let stored = state
            .orders
            .get_mut(&order_id)
            .ok_or(OrderError::NotFound(order_id))?;
        stored.status = status;
        stored.reason = reason;
        stored.receipt_id = receipt_id;
        stored.updated_at = now;
        let snapshot = stored.clone();

        if state.in_flight.get(&snapshot.hold_id) == Some(&order_id) {
            state.in_flight.remove(&snapshot.hold_id);
        }
        Ok(snapshot)
    }

    fn publish_update(&self, order: &Order) {
        let event = RealtimeEvent::new(
            RealtimeEventKind::PaymentUpdate,
            self.clock.now(),
            PaymentUpdatePayload {
                order_id: order.id,
                hold_id: order.hold_id,
                status: order.status.to_string(),
                reason: order.reason.clone(),
                receipt_id: order.receipt_id,
            },
        );
        self.events.publish(&reservation_channel(order.hold_id), event);
    }

    fn state(&self) -> MutexGuard<'_, OrderState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Receipt not found: {0}")]
    ReceiptNotFound(Uuid),

    #[error("Hold not found: {0}")]
    HoldNotFound(Uuid),

    #[error("Hold is no longer active")]
    HoldExpired,

    #[error("Payment attempt {order_id} is already in flight for this hold")]
    InFlight { order_id: Uuid },

    #[error("State moved concurrently, retry")]
    Conflict,

    #[error("Payment gateway error: {0}")]
    Gateway(String),
}
