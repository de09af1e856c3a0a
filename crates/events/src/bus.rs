//! Fan-out of record changes inside one process.
//!
//! The in-memory store publishes every mutation here as a [`StoreEvent`];
//! each subscription holds its own `broadcast` receiver and picks out the
//! collection it cares about.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::RecordEvent;

/// Events a receiver may fall behind by before it starts losing them.
pub const BUS_CAPACITY: usize = 1024;

/// A record change together with the collection it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEvent {
    pub collection: String,
    pub event: RecordEvent,
}

impl StoreEvent {
    pub fn new(collection: impl Into<String>, event: RecordEvent) -> Self {
        Self {
            collection: collection.into(),
            event,
        }
    }
}

/// Broadcast hub for [`StoreEvent`]s. Share it behind an `Arc`.
///
/// ```rust
/// use pinboard_events::{EventBus, Record, RecordAction, RecordEvent, StoreEvent};
///
/// let bus = EventBus::default();
/// let mut changes = bus.subscribe();
///
/// let record = Record::new("abc", Default::default());
/// bus.publish(StoreEvent::new("widgets", RecordEvent::new(RecordAction::Create, record)));
/// assert_eq!(changes.try_recv().unwrap().collection, "widgets");
/// ```
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// A bus whose receivers lag (`RecvError::Lagged`) once more than
    /// `capacity` events are unread.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    /// Deliver `event` to every receiver alive right now.
    pub fn publish(&self, event: StoreEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Store event published with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordAction};
    use serde_json::{json, Map};
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn widget_created(id: &str) -> StoreEvent {
        let mut fields = Map::new();
        fields.insert("dashboard".into(), json!("d1"));
        StoreEvent::new(
            "widgets",
            RecordEvent::new(RecordAction::Create, Record::new(id, fields)),
        )
    }

    #[tokio::test]
    async fn subscriber_sees_published_change() {
        let bus = EventBus::default();
        let mut changes = bus.subscribe();

        bus.publish(widget_created("w1"));

        let change = changes.recv().await.unwrap();
        assert_eq!(change.collection, "widgets");
        assert_eq!(change.event.action, RecordAction::Create);
        assert_eq!(change.event.record.id, "w1");
        assert_eq!(change.event.record.str_field("dashboard"), Some("d1"));
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(widget_created("w2"));

        assert_eq!(first.recv().await.unwrap(), second.recv().await.unwrap());
    }

    #[test]
    fn late_subscriber_misses_earlier_changes() {
        let bus = EventBus::default();
        bus.publish(widget_created("before"));

        let mut changes = bus.subscribe();
        assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = EventBus::with_capacity(2);
        let mut changes = bus.subscribe();
        for id in ["a", "b", "c"] {
            bus.publish(widget_created(id));
        }

        assert_eq!(changes.recv().await, Err(RecvError::Lagged(1)));
        assert_eq!(changes.recv().await.unwrap().event.record.id, "b");
    }
}
