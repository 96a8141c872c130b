//! Broadcasts sync results to live clients.
//!
//! Delivery is best effort: a client that is not subscribed when a message is
//! sent never sees it, and a client that has gone away is dropped silently.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// A message sent to every subscribed client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncMessage {
    /// A replay pass finished. Clients should re-fetch anything they cache.
    SyncComplete {
        replayed: usize,
        discarded: usize,
        remaining: usize,
    },
}

/// Fan-out of [`SyncMessage`]s to subscribers.
#[derive(Default)]
pub struct ClientNotifier {
    subscribers: Mutex<Vec<Sender<SyncMessage>>>,
}

impl ClientNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client.
    pub fn subscribe(&self) -> Receiver<SyncMessage> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Send `message` to every live subscriber, returning how many received it.
    pub fn broadcast(&self, message: &SyncMessage) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        subscribers.len()
    }

    /// Number of subscribers seen alive at the last broadcast.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> SyncMessage {
        SyncMessage::SyncComplete {
            replayed: 2,
            discarded: 0,
            remaining: 0,
        }
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_value(complete()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "SYNC_COMPLETE", "replayed": 2, "discarded": 0, "remaining": 0})
        );
    }

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let notifier = ClientNotifier::new();
        let a = notifier.subscribe();
        let b = notifier.subscribe();

        assert_eq!(notifier.broadcast(&complete()), 2);
        assert_eq!(a.try_recv().unwrap(), complete());
        assert_eq!(b.try_recv().unwrap(), complete());
    }

    #[test]
    fn test_departed_subscribers_are_pruned() {
        let notifier = ClientNotifier::new();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());

        assert_eq!(notifier.broadcast(&complete()), 1);
        assert_eq!(notifier.subscriber_count(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let notifier = ClientNotifier::new();
        assert_eq!(notifier.broadcast(&complete()), 0);
    }
}
