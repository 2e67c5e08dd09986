use cresta_shared::models::events::RealtimeEvent;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

/// In-process fan-out hub: one bounded broadcast channel per logical channel
/// name ("unit:<id>", "reservation:<id>").
///
/// Publishers never block and never wait on subscribers. Each subscriber
/// owns a bounded buffer; one that falls behind sees a lag gap on receive
/// and is expected to re-sync over HTTP. Channels materialize on first use
/// and are dropped once nobody is listening.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<RealtimeEvent>>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Subscribe to a channel. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<RealtimeEvent> {
        let mut channels = self.lock();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish to a channel, returning how many subscribers it reached.
    /// A channel with no remaining subscribers is garbage-collected here.
    pub fn publish(&self, channel: &str, event: RealtimeEvent) -> usize {
        let mut channels = self.lock();
        let delivered = channels
            .get(channel)
            .map(|tx| tx.send(event).unwrap_or(0))
            .unwrap_or(0);
        if delivered == 0 && channels.remove(channel).is_some() {
            debug!("Channel {} dropped, no subscribers left", channel);
        }
        delivered
    }

    pub fn channel_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<RealtimeEvent>>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cresta_shared::models::events::RealtimeEventKind;
    use tokio::sync::broadcast::error::TryRecvError;

    fn event(kind: RealtimeEventKind) -> RealtimeEvent {
        RealtimeEvent::new(kind, Utc::now(), serde_json::json!({}))
    }

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe("unit:a");

        let delivered = bus.publish("unit:a", event(RealtimeEventKind::UnitHeld));
        assert_eq!(delivered, 1);

        let received = rx.try_recv().unwrap();
        assert_eq!(received.kind, RealtimeEventKind::UnitHeld);
    }

    #[test]
    fn test_channels_are_isolated() {
        let bus = EventBus::new(16);
        let mut rx_a = bus.subscribe("unit:a");
        let mut rx_b = bus.subscribe("unit:b");

        bus.publish("unit:a", event(RealtimeEventKind::UnitHeld));

        assert!(rx_a.try_recv().is_ok());
        assert!(matches!(rx_b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_dead_channels_are_collected() {
        let bus = EventBus::new(16);
        let rx = bus.subscribe("unit:a");
        assert_eq!(bus.channel_count(), 1);

        drop(rx);
        assert_eq!(bus.publish("unit:a", event(RealtimeEventKind::UnitReleased)), 0);
        assert_eq!(bus.channel_count(), 0);

        // publishing into the void is a no-op, not an error
        assert_eq!(bus.publish("unit:zzz", event(RealtimeEventKind::UnitReleased)), 0);
    }

    #[test]
    fn test_slow_subscriber_sees_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe("unit:a");

        for _ in 0..5 {
            bus.publish("unit:a", event(RealtimeEventKind::HoldTick));
        }

        // the two newest events survive; the receive reports the gap first
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(3))));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
