//! Queue event types and EventBus
//!
//! The Queue Store publishes one event per successful mutation. Events are
//! broadcast via `EventBus`, serialized for SSE transmission and read back by
//! the display's event follower.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::QueueEntry;

/// How an entry got into the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EnqueueSource {
    /// Submitted through the form
    Manual,
    /// Picked from the fallback catalog by the idle auto-fill
    Automatic,
}

impl std::fmt::Display for EnqueueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnqueueSource::Manual => write!(f, "Manual"),
            EnqueueSource::Automatic => write!(f, "Automatic"),
        }
    }
}

/// Queue events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueueEvent {
    /// New entry appended at the tail
    EntryAdded {
        entry: QueueEntry,
        source: EnqueueSource,
        queue_length: usize,
        timestamp: DateTime<Utc>,
    },

    /// Head consumed by playback (ended, error skip or manual advance)
    CurrentAdvanced {
        removed_id: String,
        /// Id of the new head, if any
        current_id: Option<String>,
        queue_length: usize,
        timestamp: DateTime<Utc>,
    },

    /// Arbitrary entry removed by id
    EntryRemoved {
        entry_id: String,
        queue_length: usize,
        timestamp: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            QueueEvent::EntryAdded { .. } => "EntryAdded",
            QueueEvent::CurrentAdvanced { .. } => "CurrentAdvanced",
            QueueEvent::EntryRemoved { .. } => "EntryRemoved",
        }
    }

    /// Queue length after the mutation
    pub fn queue_length(&self) -> usize {
        match self {
            QueueEvent::EntryAdded { queue_length, .. }
            | QueueEvent::CurrentAdvanced { queue_length, .. }
            | QueueEvent::EntryRemoved { queue_length, .. } => *queue_length,
        }
    }
}

/// Fan-out of queue events to `GET /events` subscribers
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lag and lose
/// the oldest events; they never block the publisher.
pub struct EventBus {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }

    /// Send to current subscribers; with none listening the event is dropped
    pub fn publish(&self, event: QueueEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No queue event subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn removed(len: usize) -> QueueEvent {
        QueueEvent::EntryRemoved {
            entry_id: "e1".to_string(),
            queue_length: len,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(16);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(removed(0));

        // A later subscriber does not see earlier events
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(removed(3));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "EntryRemoved");
        assert_eq!(received.queue_length(), 3);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = QueueEvent::CurrentAdvanced {
            removed_id: "a".to_string(),
            current_id: Some("b".to_string()),
            queue_length: 1,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CurrentAdvanced");
        assert_eq!(json["current_id"], "b");

        let back: QueueEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "CurrentAdvanced");
    }
}
