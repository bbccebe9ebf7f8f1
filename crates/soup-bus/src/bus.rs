//! Subscriber registry and publish path.

use parking_lot::RwLock;
use soup_core::LiveEvent;
use soup_telemetry::Metrics;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Fan-out bus delivering every published event to every live
/// subscriber, in publish order.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    subscribers: RwLock<HashMap<u64, UnboundedSender<LiveEvent>>>,
    next_id: AtomicU64,
}

/// A live subscription: the receiving half of a per-subscriber channel
/// plus the id needed to unsubscribe.
pub struct Subscription {
    pub id: u64,
    pub rx: UnboundedReceiver<LiveEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscriber. Events published after this call are
    /// delivered to it; nothing is replayed.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut subs = self.inner.subscribers.write();
            subs.insert(id, tx);
            subs.len()
        };
        Metrics::set_live_subscribers(count);
        debug!(id, subscribers = count, "Subscriber registered");
        Subscription { id, rx }
    }

    /// Remove a subscriber. Safe to call for an id already evicted.
    pub fn unsubscribe(&self, id: u64) {
        let count = {
            let mut subs = self.inner.subscribers.write();
            subs.remove(&id);
            subs.len()
        };
        Metrics::set_live_subscribers(count);
        debug!(id, subscribers = count, "Subscriber removed");
    }

    /// Deliver `event` to every current subscriber. Subscribers whose
    /// receiver has been dropped are evicted here.
    pub fn publish(&self, event: LiveEvent) {
        let dead: Vec<u64> = {
            let subs = self.inner.subscribers.read();
            subs.iter()
                .filter(|(_, tx)| tx.send(event.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };

        if !dead.is_empty() {
            let count = {
                let mut subs = self.inner.subscribers.write();
                for id in &dead {
                    subs.remove(id);
                }
                subs.len()
            };
            Metrics::set_live_subscribers(count);
            debug!(evicted = dead.len(), subscribers = count, "Evicted dead subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soup_core::StationPosition;

    fn event(callsign: &str, timestamp_ms: i64) -> LiveEvent {
        LiveEvent::Position(StationPosition {
            callsign: callsign.to_string(),
            ssid: "0".to_string(),
            lat: 47.0,
            lon: -122.0,
            timestamp_ms,
        })
    }

    #[tokio::test]
    async fn test_each_subscriber_sees_every_event_in_order() {
        let bus = EventBus::new();
        let mut sub_a = bus.subscribe();
        let mut sub_b = bus.subscribe();

        for i in 0..5 {
            bus.publish(event("N0CALL", i));
        }

        for sub in [&mut sub_a, &mut sub_b] {
            for i in 0..5 {
                match sub.rx.recv().await.unwrap() {
                    LiveEvent::Position(p) => assert_eq!(p.timestamp_ms, i),
                    other => panic!("unexpected event: {other:?}"),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        bus.publish(event("N0CALL", 1));
        bus.unsubscribe(sub.id);
        bus.publish(event("N0CALL", 2));

        match sub.rx.recv().await.unwrap() {
            LiveEvent::Position(p) => assert_eq!(p.timestamp_ms, 1),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(sub.rx.recv().await.is_none());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_subscriber_evicted_on_publish() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let _live = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub.rx);
        bus.publish(event("N0CALL", 1));

        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.publish(event("N0CALL", 1));

        let mut sub = bus.subscribe();
        bus.publish(event("N0CALL", 2));

        match sub.rx.recv().await.unwrap() {
            LiveEvent::Position(p) => assert_eq!(p.timestamp_ms, 2),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
