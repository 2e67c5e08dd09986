use crate::state::AppState;
use cresta_shared::models::events::{
    reservation_channel, unit_channel, HoldTickPayload, RealtimeEvent, RealtimeEventKind,
};
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// Launch the two background tasks that run for the life of the process.
pub fn spawn_workers(state: AppState) {
    tokio::spawn(run_expiry_sweep(state.clone()));
    tokio::spawn(run_tick_broadcaster(state));
}

/// Periodic expiry sweep. The lazy checks keep every read path honest, but
/// a unit nobody reads would sit falsely held without this; it reclaims
/// overdue holds through the same compare-and-swap as everything else.
pub async fn run_expiry_sweep(state: AppState) {
    let period = Duration::from_secs(state.business_rules.sweep_interval_seconds);
    info!("Expiry sweep running every {:?}", period);
    let mut ticker = interval(period);
    ticker.tick().await; // the first tick fires immediately

    loop {
        ticker.tick().await;
        let swept = state.holds.sweep();
        if swept > 0 {
            state.metrics.expiries.inc_by(swept as u64);
            info!("Sweep reclaimed {} overdue holds", swept);
        }
    }
}

/// Countdown broadcaster: a `hold_tick` with the authoritative remaining
/// time for every live hold, so the front end never does wall-clock math
/// against a possibly-wrong local clock.
pub async fn run_tick_broadcaster(state: AppState) {
    let period = Duration::from_millis(state.business_rules.tick_interval_ms);
    info!("Hold tick broadcaster running every {:?}", period);
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;
        let now = state.clock.now();
        let holds = state.holds.active_holds();
        state.metrics.active_holds.set(holds.len() as i64);

        for hold in holds {
            let event = RealtimeEvent::new(
                RealtimeEventKind::HoldTick,
                now,
                HoldTickPayload {
                    hold_id: hold.id,
                    unit_id: hold.unit_id,
                    remaining_ms: hold.remaining_ms(now),
                },
            );
            let delivered = state.events.publish(&reservation_channel(hold.id), event.clone())
                + state.events.publish(&unit_channel(hold.unit_id), event);
            if delivered > 0 {
                debug!("Tick for hold {} reached {} subscribers", hold.id, delivered);
            }
        }
    }
}
