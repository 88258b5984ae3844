//! C8 Event Bus: a best-effort fan-out of UTF-8 JSON-encoded
//! [`ChangeEvent`](showcaster_core::model::ChangeEvent) notifications to whichever
//! subscribers happen to be listening when a commit lands (§4.8: "payloads are
//! UTF-8 JSON encodings of `ChangeEvent`"). Publishing never blocks and never fails
//! the caller: a subscriber that falls behind the channel's capacity silently misses
//! the events it lagged on.

use showcaster_core::model::ChangeEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Wraps a `tokio::sync::broadcast` channel carrying the JSON-encoded bytes of each
/// published [`ChangeEvent`], matching §4.8's `publish(bytes)`/`subscribe() → async
/// iterator of bytes` contract directly (rather than a typed channel an SSE layer
/// would have to re-serialize).
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Vec<u8>>,
}

impl EventBus {
    /// Builds a bus with `DEFAULT_CAPACITY` buffered events per subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Builds a bus with a given per-subscriber buffer size.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Encodes `event` as UTF-8 JSON and publishes it to every current subscriber. A
    /// no-op (not an error) if there are none; the send is dropped on the floor if a
    /// subscriber has fallen behind. A serialization failure is logged and otherwise
    /// swallowed — publish is the one fire-and-forget path in the core (§7).
    pub fn publish(&self, event: ChangeEvent) {
        match serde_json::to_vec(&event) {
            Ok(bytes) => {
                let _ = self.sender.send(bytes);
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = ?event.kind, "failed to encode ChangeEvent for bus publish");
            }
        }
    }

    /// Subscribes to future events. The returned receiver only sees events published
    /// after this call, each as the UTF-8 JSON bytes of a `ChangeEvent` (§6).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.sender.subscribe()
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
    use chrono::Utc;
    use showcaster_core::model::{ChangeEventKind, Show};
    use uuid::Uuid;

    fn sample_show() -> Show {
        Show {
            id: Uuid::new_v4(),
            title: "Sample".to_string(),
            description: None,
            events: None,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event_as_json() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.publish(ChangeEvent::show(ChangeEventKind::ShowCreated, Utc::now(), sample_show()));
        let received = rx.recv().await.unwrap();
        let decoded: ChangeEvent = serde_json::from_slice(&received).unwrap();
        assert_eq!(decoded.kind, ChangeEventKind::ShowCreated);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(ChangeEvent::show(ChangeEventKind::ShowDeleted, Utc::now(), sample_show()));
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_copy() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(ChangeEvent::show(ChangeEventKind::ShowUpdated, Utc::now(), sample_show()));
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
