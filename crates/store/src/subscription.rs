//! Owned handle for a realtime change feed.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pinboard_events::RecordEvent;

/// Events buffered per subscription before the producer waits.
pub const SUBSCRIPTION_BUFFER: usize = 256;

/// A live change feed.
///
/// The background task feeding it is cancelled when the handle is
/// dropped, so no events are delivered after the owner goes away.
pub struct Subscription {
    events: mpsc::Receiver<RecordEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Create a subscription and the sender half its producer task uses.
    pub fn channel(cancel: CancellationToken) -> (mpsc::Sender<RecordEvent>, Self) {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        (tx, Self { events: rx, cancel })
    }

    /// Next event, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<RecordEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop the feed. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinboard_events::{Record, RecordAction};

    fn event(id: &str) -> RecordEvent {
        RecordEvent::new(RecordAction::Update, Record::new(id, Default::default()))
    }

    #[tokio::test]
    async fn delivers_until_unsubscribed() {
        let cancel = CancellationToken::new();
        let (tx, mut sub) = Subscription::channel(cancel.clone());

        tx.send(event("a")).await.unwrap();
        assert_eq!(sub.next().await.map(|e| e.record.id), Some("a".into()));

        sub.unsubscribe();
        assert!(cancel.is_cancelled());
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn drop_cancels_producer_token() {
        let cancel = CancellationToken::new();
        let (_tx, sub) = Subscription::channel(cancel.clone());
        drop(sub);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn closed_sender_ends_feed() {
        let (tx, mut sub) = Subscription::channel(CancellationToken::new());
        drop(tx);
        assert!(sub.next().await.is_none());
        assert!(sub.is_active());
    }
}
