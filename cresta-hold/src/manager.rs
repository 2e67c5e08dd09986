use crate::models::{BuyerInfo, Hold, HoldStatus};
use chrono::{DateTime, Duration, Utc};
use cresta_core::Clock;
use cresta_registry::{RegistryError, UnitRegistry, UnitStatus};
use cresta_shared::models::events::{
    reservation_channel, unit_channel, HoldExtendPayload, RealtimeEvent, RealtimeEventKind,
    ReleaseReason, UnitHeldPayload, UnitReleasedPayload, UnitSoldPayload,
};
use cresta_store::EventBus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct HoldState {
    holds: HashMap<Uuid, Hold>,
    /// unit -> its single active hold; the exclusivity index.
    active_by_unit: HashMap<Uuid, Uuid>,
    /// (user, lock idempotency key) -> hold created for it. Keys are scoped
    /// per user so two buyers sending the same header value never share a hold.
    idempotency: HashMap<(String, String), Uuid>,
}

/// The hold state machine.
///
/// All transitions run under one lock, and every unit status change inside
/// them goes through the registry compare-and-swap, so at any instant a unit
/// has at most one active hold and the registry agrees with the index.
///
/// Expiry is lazy: every entry point settles an overdue hold against the
/// clock before acting on it. The background sweep covers units nobody is
/// reading.
pub struct HoldManager {
    registry: Arc<UnitRegistry>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    hold_seconds: i64,
    inner: Mutex<HoldState>,
}

impl HoldManager {
    pub fn new(
        registry: Arc<UnitRegistry>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        hold_seconds: i64,
    ) -> Self {
        Self {
            registry,
            clock,
            events,
            hold_seconds,
            inner: Mutex::new(HoldState::default()),
        }
    }

    /// Acquire an exclusive hold on a unit.
    ///
    /// Replaying an idempotency key returns the hold created the first time
    /// without touching unit availability again, so a retried request can
    /// never consume two units or trip over its own earlier success.
    pub fn lock(
        &self,
        unit_id: Uuid,
        user_id: &str,
        idempotency_key: &str,
    ) -> Result<Hold, HoldError> {
        let now = self.clock.now();
        let replay_key = (user_id.to_string(), idempotency_key.to_string());
        let mut state = self.state();

        if let Some(hold_id) = state.idempotency.get(&replay_key).copied() {
            self.expire_if_due(&mut state, hold_id, now);
            let hold = state
                .holds
                .get(&hold_id)
                .cloned()
                .ok_or(HoldError::NotFound(hold_id))?;
            debug!("Idempotent lock replay for hold {}", hold.id);
            return Ok(hold);
        }

        // A hold that ran out but was never read back still pins the unit;
        // settle it before judging availability.
        if let Some(existing_id) = state.active_by_unit.get(&unit_id).copied() {
            self.expire_if_due(&mut state, existing_id, now);
        }

        if let Some(existing) = state
            .active_by_unit
            .get(&unit_id)
            .and_then(|id| state.holds.get(id))
        {
            return Err(HoldError::AlreadyHeld {
                remaining_ms: existing.remaining_ms(now),
            });
        }

        // The single atomic acquisition point: win the available -> held
        // swap or lose with the reason.
        match self
            .registry
            .try_set_status(&unit_id, UnitStatus::Available, UnitStatus::Held)
        {
            Ok(()) => {}
            Err(RegistryError::NotFound(_)) => return Err(HoldError::UnitNotFound(unit_id)),
            Err(RegistryError::Conflict { actual, .. })
                if actual == UnitStatus::Sold || actual == UnitStatus::Unavailable =>
            {
                return Err(HoldError::UnitNotAvailable { status: actual });
            }
            Err(_) => return Err(HoldError::Conflict),
        }

        let hold = Hold::new(unit_id, user_id, now, self.hold_seconds);
        state.active_by_unit.insert(unit_id, hold.id);
        state.idempotency.insert(replay_key, hold.id);
        state.holds.insert(hold.id, hold.clone());

        info!(
            "Unit {} locked by {} until {} (hold {})",
            unit_id, user_id, hold.expires_at, hold.id
        );
        self.publish_both(
            unit_id,
            hold.id,
            RealtimeEvent::new(
                RealtimeEventKind::UnitHeld,
                now,
                UnitHeldPayload {
                    unit_id,
                    hold_id: hold.id,
                    expires_at: hold.expires_at.timestamp_millis(),
                    remaining_ms: hold.remaining_ms(now),
                },
            ),
        );

        Ok(hold)
    }

    /// Read a hold, settling lazy expiry first. Serves every read path, so
    /// a poll after the window closes observes `expired`, never stale
    /// `active`.
    pub fn get(&self, hold_id: Uuid) -> Result<Hold, HoldError> {
        let now = self.clock.now();
        let mut state = self.state();
        self.expire_if_due(&mut state, hold_id, now);
        state
            .holds
            .get(&hold_id)
            .cloned()
            .ok_or(HoldError::NotFound(hold_id))
    }

    /// Push the expiry window out by the full hold duration from now.
    pub fn renew(&self, hold_id: Uuid) -> Result<Hold, HoldError> {
        let now = self.clock.now();
        let mut state = self.state();
        self.expire_if_due(&mut state, hold_id, now);

        let hold = state
            .holds
            .get_mut(&hold_id)
            .ok_or(HoldError::NotFound(hold_id))?;
        if hold.status != HoldStatus::Active {
            return Err(HoldError::NotActive {
                status: hold.status,
            });
        }

        hold.expires_at = now + Duration::seconds(self.hold_seconds);
        let hold = hold.clone();
        debug!("Hold {} renewed until {}", hold.id, hold.expires_at);
        self.publish_both(
            hold.unit_id,
            hold.id,
            RealtimeEvent::new(
                RealtimeEventKind::HoldExtend,
                now,
                HoldExtendPayload {
                    hold_id: hold.id,
                    unit_id: hold.unit_id,
                    expires_at: hold.expires_at.timestamp_millis(),
                    remaining_ms: hold.remaining_ms(now),
                },
            ),
        );

        Ok(hold)
    }

    /// Record that the buyer has reviewed the purchase terms.
    pub fn confirm_review(&self, hold_id: Uuid) -> Result<Hold, HoldError> {
        self.update_active(hold_id, |hold| hold.review_confirmed = true)
    }

    /// Attach or replace buyer details on an active hold.
    pub fn update_buyer(&self, hold_id: Uuid, buyer: BuyerInfo) -> Result<Hold, HoldError> {
        self.update_active(hold_id, move |hold| hold.buyer = Some(buyer))
    }

    /// Voluntary cancel. Calling it again once the hold is terminal is a
    /// no-op that returns the current record, not an error: cancel buttons
    /// get double-clicked.
    pub fn release(&self, hold_id: Uuid) -> Result<Hold, HoldError> {
        let now = self.clock.now();
        let mut state = self.state();
        self.expire_if_due(&mut state, hold_id, now);

        let hold = state
            .holds
            .get_mut(&hold_id)
            .ok_or(HoldError::NotFound(hold_id))?;
        if hold.status.is_terminal() {
            return Ok(hold.clone());
        }

        hold.status = HoldStatus::Released;
        let hold = hold.clone();
        state.active_by_unit.remove(&hold.unit_id);
        if let Err(e) =
            self.registry
                .try_set_status(&hold.unit_id, UnitStatus::Held, UnitStatus::Available)
        {
            warn!("Unit {} release hit {}", hold.unit_id, e);
        }

        info!("Hold {} released, unit {} back in the pool", hold.id, hold.unit_id);
        self.publish_both(
            hold.unit_id,
            hold.id,
            RealtimeEvent::new(
                RealtimeEventKind::UnitReleased,
                now,
                UnitReleasedPayload {
                    unit_id: hold.unit_id,
                    hold_id: hold.id,
                    reason: ReleaseReason::Released,
                },
            ),
        );

        Ok(hold)
    }

    /// Promote a paid-up hold into a sale. Unit first, then hold, so no
    /// reader can ever observe a confirmed hold on an unsold unit.
    pub fn confirm_sale(&self, hold_id: Uuid, order_id: Uuid) -> Result<Hold, HoldError> {
        let now = self.clock.now();
        let mut state = self.state();
        self.expire_if_due(&mut state, hold_id, now);

        let hold = state
            .holds
            .get_mut(&hold_id)
            .ok_or(HoldError::NotFound(hold_id))?;
        match hold.status {
            HoldStatus::Active => {}
            HoldStatus::Expired => return Err(HoldError::Expired),
            status => return Err(HoldError::NotActive { status }),
        }

        if let Err(e) =
            self.registry
                .try_set_status(&hold.unit_id, UnitStatus::Held, UnitStatus::Sold)
        {
            warn!("Unit {} sale swap hit {}", hold.unit_id, e);
            return Err(HoldError::Conflict);
        }

        hold.status = HoldStatus::Confirmed;
        let hold = hold.clone();
        state.active_by_unit.remove(&hold.unit_id);

        info!("Unit {} sold under hold {} (order {})", hold.unit_id, hold.id, order_id);
        self.publish_both(
            hold.unit_id,
            hold.id,
            RealtimeEvent::new(
                RealtimeEventKind::UnitSold,
                now,
                UnitSoldPayload {
                    unit_id: hold.unit_id,
                    hold_id: hold.id,
                    order_id,
                },
            ),
        );

        Ok(hold)
    }

    /// Settle lazy expiry for whatever hold currently pins a unit.
    pub fn evaluate_unit(&self, unit_id: Uuid) {
        let now = self.clock.now();
        let mut state = self.state();
        if let Some(hold_id) = state.active_by_unit.get(&unit_id).copied() {
            self.expire_if_due(&mut state, hold_id, now);
        }
    }

    /// Expire every overdue hold, returning how many were settled. The lazy
    /// checks keep read paths honest; this keeps units from sitting falsely
    /// held when nobody reads them.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state();
        let due: Vec<Uuid> = state
            .active_by_unit
            .values()
            .copied()
            .filter(|id| {
                state
                    .holds
                    .get(id)
                    .map(|h| h.is_expired(now))
                    .unwrap_or(false)
            })
            .collect();
        for hold_id in &due {
            self.expire_if_due(&mut state, *hold_id, now);
        }
        due.len()
    }

    /// Snapshot of the holds still inside their window, for the countdown
    /// broadcaster.
    pub fn active_holds(&self) -> Vec<Hold> {
        let now = self.clock.now();
        let state = self.state();
        state
            .active_by_unit
            .values()
            .filter_map(|id| state.holds.get(id))
            .filter(|h| h.status == HoldStatus::Active && !h.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active_holds().len()
    }

    /// Shared gate for the small mutations that only make sense on a live
    /// hold: expired holds answer with `Expired`, other terminals with
    /// `NotActive`.
    fn update_active(
        &self,
        hold_id: Uuid,
        mutate: impl FnOnce(&mut Hold),
    ) -> Result<Hold, HoldError> {
        let now = self.clock.now();
        let mut state = self.state();
        self.expire_if_due(&mut state, hold_id, now);

        let hold = state
            .holds
            .get_mut(&hold_id)
            .ok_or(HoldError::NotFound(hold_id))?;
        match hold.status {
            HoldStatus::Active => {}
            HoldStatus::Expired => return Err(HoldError::Expired),
            status => return Err(HoldError::NotActive { status }),
        }

        mutate(hold);
        state
            .holds
            .get(&hold_id)
            .cloned()
            .ok_or(HoldError::NotFound(hold_id))
    }

    /// Flip an overdue active hold to `expired` and free its unit. No-op
    /// for anything else. Runs inside the state lock, so observers can
    /// never see the expired hold and the held unit at the same time.
    fn expire_if_due(&self, state: &mut HoldState, hold_id: Uuid, now: DateTime<Utc>) {
        let Some(hold) = state.holds.get_mut(&hold_id) else {
            return;
        };
        if hold.status != HoldStatus::Active || !hold.is_expired(now) {
            return;
        }

        hold.status = HoldStatus::Expired;
        let hold = hold.clone();
        state.active_by_unit.remove(&hold.unit_id);
        if let Err(e) =
            self.registry
                .try_set_status(&hold.unit_id, UnitStatus::Held, UnitStatus::Available)
        {
            warn!("Unit {} release after expiry hit {}", hold.unit_id, e);
        }

        info!("Hold {} expired, unit {} back in the pool", hold.id, hold.unit_id);
        self.publish_both(
            hold.unit_id,
            hold.id,
            RealtimeEvent::new(
                RealtimeEventKind::UnitReleased,
                now,
                UnitReleasedPayload {
                    unit_id: hold.unit_id,
                    hold_id: hold.id,
                    reason: ReleaseReason::Expired,
                },
            ),
        );
    }

    fn publish_both(&self, unit_id: Uuid, hold_id: Uuid, event: RealtimeEvent) {
        self.events.publish(&unit_channel(unit_id), event.clone());
        self.events.publish(&reservation_channel(hold_id), event);
    }

    fn state(&self) -> MutexGuard<'_, HoldState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HoldError {
    #[error("Unit not found: {0}")]
    UnitNotFound(Uuid),

    #[error("Unit already held, {remaining_ms} ms remaining")]
    AlreadyHeld { remaining_ms: i64 },

    #[error("Unit is not available: {status}")]
    UnitNotAvailable { status: UnitStatus },

    #[error("Hold not found: {0}")]
    NotFound(Uuid),

    #[error("Hold is {status}, not active")]
    NotActive { status: HoldStatus },

    #[error("Hold has expired")]
    Expired,

    #[error("State moved concurrently, retry")]
    Conflict,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cresta_core::ManualClock;
    use cresta_registry::{Unit, UnitType};
    use cresta_shared::Masked;

    fn villa(code: &str) -> Unit {
        Unit {
            id: Uuid::new_v4(),
            code: code.to_string(),
            unit_type: UnitType::Villa,
            floor: 0,
            price_minor: 185_000_000,
            currency: "EUR".to_string(),
            area_sqm: 412.5,
            orientation: "sea".to_string(),
            status: UnitStatus::Available,
        }
    }

    struct TestEnv {
        manager: HoldManager,
        clock: Arc<ManualClock>,
        registry: Arc<UnitRegistry>,
        bus: EventBus,
        unit_id: Uuid,
        second_unit_id: Uuid,
    }

    fn setup() -> TestEnv {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let first = villa("V-01");
        let second = villa("V-02");
        let unit_id = first.id;
        let second_unit_id = second.id;
        let registry = Arc::new(UnitRegistry::new(vec![first, second]));
        let bus = EventBus::new(16);
        let manager = HoldManager::new(registry.clone(), clock.clone(), bus.clone(), 600);
        TestEnv {
            manager,
            clock,
            registry,
            bus,
            unit_id,
            second_unit_id,
        }
    }

    fn buyer() -> BuyerInfo {
        BuyerInfo {
            full_name: "Ana Petrova".to_string(),
            email: Masked::new("ana@example.com".to_string()),
            phone: Masked::new("+359888123456".to_string()),
            nationality: Some("BG".to_string()),
            note: None,
        }
    }

    #[test]
    fn test_lock_and_read_back() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        assert_eq!(hold.status, HoldStatus::Active);
        assert_eq!(hold.remaining_ms(env.clock.now()), 600_000);
        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Held);

        let read = env.manager.get(hold.id).unwrap();
        assert_eq!(read.id, hold.id);
        assert_eq!(read.user_id, "user-x");
    }

    #[test]
    fn test_lock_is_exclusive() {
        let env = setup();
        env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        let err = env.manager.lock(env.unit_id, "user-y", "key-2").unwrap_err();
        match err {
            HoldError::AlreadyHeld { remaining_ms } => assert_eq!(remaining_ms, 600_000),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lock_idempotent_replay() {
        let env = setup();
        let first = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        let replay = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        assert_eq!(first.id, replay.id);
        assert_eq!(env.manager.active_count(), 1);
    }

    #[test]
    fn test_lock_replay_is_scoped_to_the_caller() {
        let env = setup();
        let first = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        // same header value from another buyer is not a replay
        let err = env.manager.lock(env.unit_id, "user-y", "key-1").unwrap_err();
        assert!(matches!(err, HoldError::AlreadyHeld { .. }));

        let other = env
            .manager
            .lock(env.second_unit_id, "user-y", "key-1")
            .unwrap();
        assert_ne!(other.id, first.id);
        assert_eq!(other.user_id, "user-y");
        assert_eq!(env.manager.active_count(), 2);
    }

    #[test]
    fn test_lock_unknown_unit() {
        let env = setup();
        let err = env.manager.lock(Uuid::new_v4(), "user-x", "key-1").unwrap_err();
        assert!(matches!(err, HoldError::UnitNotFound(_)));
    }

    #[test]
    fn test_lock_sold_unit() {
        let env = setup();
        env.registry
            .try_set_status(&env.unit_id, UnitStatus::Available, UnitStatus::Sold)
            .unwrap();

        let err = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap_err();
        match err {
            HoldError::UnitNotAvailable { status } => assert_eq!(status, UnitStatus::Sold),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lazy_expiry_on_read() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        env.clock.advance(Duration::seconds(601));

        let read = env.manager.get(hold.id).unwrap();
        assert_eq!(read.status, HoldStatus::Expired);
        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Available);
    }

    #[test]
    fn test_expired_unit_can_be_relocked() {
        let env = setup();
        env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        env.clock.advance(Duration::seconds(601));

        // nobody read the expired hold back; the lock path settles it itself
        let hold = env.manager.lock(env.unit_id, "user-y", "key-2").unwrap();
        assert_eq!(hold.user_id, "user-y");
        assert_eq!(hold.status, HoldStatus::Active);
    }

    #[test]
    fn test_renew_extends_window() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        env.clock.advance(Duration::seconds(300));
        let renewed = env.manager.renew(hold.id).unwrap();

        assert_eq!(renewed.remaining_ms(env.clock.now()), 600_000);
        assert_eq!(renewed.expires_at, hold.created_at + Duration::seconds(900));
    }

    #[test]
    fn test_renew_rejects_expired() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        env.clock.advance(Duration::seconds(601));

        let err = env.manager.renew(hold.id).unwrap_err();
        match err {
            HoldError::NotActive { status } => assert_eq!(status, HoldStatus::Expired),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_review_and_buyer_on_active_hold() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        let updated = env.manager.confirm_review(hold.id).unwrap();
        assert!(updated.review_confirmed);

        let updated = env.manager.update_buyer(hold.id, buyer()).unwrap();
        assert_eq!(updated.buyer.unwrap().full_name, "Ana Petrova");
    }

    #[test]
    fn test_buyer_update_rejected_after_expiry() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        env.clock.advance(Duration::seconds(601));

        assert!(matches!(
            env.manager.update_buyer(hold.id, buyer()),
            Err(HoldError::Expired)
        ));
        assert!(matches!(
            env.manager.confirm_review(hold.id),
            Err(HoldError::Expired)
        ));
    }

    #[test]
    fn test_release_returns_unit_and_is_idempotent() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();

        let released = env.manager.release(hold.id).unwrap();
        assert_eq!(released.status, HoldStatus::Released);
        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Available);

        // double-clicked cancel: same outcome, no error, no second release
        let again = env.manager.release(hold.id).unwrap();
        assert_eq!(again.status, HoldStatus::Released);
    }

    #[test]
    fn test_release_after_expiry_keeps_expired() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        env.clock.advance(Duration::seconds(601));

        let settled = env.manager.release(hold.id).unwrap();
        assert_eq!(settled.status, HoldStatus::Expired);
        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Available);
    }

    #[test]
    fn test_confirm_sale_marks_unit_sold() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        let order_id = Uuid::new_v4();

        let confirmed = env.manager.confirm_sale(hold.id, order_id).unwrap();
        assert_eq!(confirmed.status, HoldStatus::Confirmed);
        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Sold);

        // a late cancel cannot undo a sale
        let after = env.manager.release(hold.id).unwrap();
        assert_eq!(after.status, HoldStatus::Confirmed);
        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Sold);
    }

    #[test]
    fn test_confirm_sale_after_expiry() {
        let env = setup();
        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        env.clock.advance(Duration::seconds(601));

        assert!(matches!(
            env.manager.confirm_sale(hold.id, Uuid::new_v4()),
            Err(HoldError::Expired)
        ));
        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Available);
    }

    #[test]
    fn test_concurrent_lock_single_winner() {
        let env = setup();
        let manager = Arc::new(env.manager);
        let unit_id = env.unit_id;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let manager = manager.clone();
                std::thread::spawn(move || {
                    manager
                        .lock(unit_id, &format!("user-{}", i), &format!("key-{}", i))
                        .is_ok()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(manager.active_count(), 1);
    }

    #[test]
    fn test_sweep_expires_overdue_holds() {
        let env = setup();
        env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        env.manager.lock(env.second_unit_id, "user-y", "key-2").unwrap();

        env.clock.advance(Duration::seconds(601));
        assert_eq!(env.manager.sweep(), 2);
        assert_eq!(env.manager.sweep(), 0);

        assert_eq!(env.registry.status(&env.unit_id).unwrap(), UnitStatus::Available);
        assert_eq!(env.registry.status(&env.second_unit_id).unwrap(), UnitStatus::Available);
    }

    #[test]
    fn test_transition_events_reach_both_channels() {
        let env = setup();
        let mut unit_rx = env.bus.subscribe(&unit_channel(env.unit_id));

        let hold = env.manager.lock(env.unit_id, "user-x", "key-1").unwrap();
        let held = unit_rx.try_recv().unwrap();
        assert_eq!(held.kind, RealtimeEventKind::UnitHeld);

        let mut hold_rx = env.bus.subscribe(&reservation_channel(hold.id));
        env.manager.release(hold.id).unwrap();

        let released_unit = unit_rx.try_recv().unwrap();
        assert_eq!(released_unit.kind, RealtimeEventKind::UnitReleased);
        let released_hold = hold_rx.try_recv().unwrap();
        assert_eq!(released_hold.kind, RealtimeEventKind::UnitReleased);
    }
}
