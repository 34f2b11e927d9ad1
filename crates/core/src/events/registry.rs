use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::types::LiveEvent;

struct Subscriber {
    id: u64,
    where_clause: Option<String>,
    sender: mpsc::Sender<LiveEvent>,
    connected: bool,
}

/// Handle returned by [`SubscriberRegistry::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    pub id: u64,
    pub content_type: String,
    pub receiver: mpsc::Receiver<LiveEvent>,
}

/// Live-update subscribers grouped by content type.
///
/// Constructed once at startup and shared by the SSE handlers and the
/// poller. Sends never block: a subscriber whose buffer is full or whose
/// receiver is gone is marked disconnected and dropped on the next cleanup.
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.subscriber_count())
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl SubscriberRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    pub fn subscribe(&self, content_type: &str, where_clause: Option<String>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.subscribers
            .lock()
            .entry(content_type.to_string())
            .or_default()
            .push(Subscriber {
                id,
                where_clause: where_clause.filter(|w| !w.is_empty()),
                sender,
                connected: true,
            });
        tracing::debug!(content_type, subscriber = id, "live subscriber added");
        Subscription {
            id,
            content_type: content_type.to_string(),
            receiver,
        }
    }

    pub fn unsubscribe(&self, content_type: &str, id: u64) {
        let mut subscribers = self.subscribers.lock();
        if let Some(list) = subscribers.get_mut(content_type) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                subscribers.remove(content_type);
            }
        }
        tracing::debug!(content_type, subscriber = id, "live subscriber removed");
    }

    /// Content types with at least one subscriber.
    pub fn content_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.subscribers.lock().keys().cloned().collect();
        types.sort();
        types
    }

    /// Send each item, filtered by every subscriber's own `where`, as a
    /// separate `new` event. Returns the number of events delivered.
    pub fn broadcast(&self, content_type: &str, items: &[Map<String, Value>]) -> usize {
        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(content_type) else {
            return 0;
        };

        let mut delivered = 0;
        for subscriber in list.iter_mut().filter(|s| s.connected) {
            let visible = match &subscriber.where_clause {
                Some(w) => query::filter_where(items.to_vec(), w),
                None => items.to_vec(),
            };
            for item in visible {
                if subscriber.sender.try_send(LiveEvent::New(item)).is_err() {
                    subscriber.connected = false;
                    tracing::debug!(content_type, subscriber = subscriber.id, "live subscriber lagging or gone");
                    break;
                }
                delivered += 1;
            }
        }
        delivered
    }

    /// Drop subscribers marked disconnected or whose receiver is gone.
    /// Returns how many were removed.
    pub fn cleanup_disconnected(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut removed = 0;
        for list in subscribers.values_mut() {
            let before = list.len();
            list.retain(|s| s.connected && !s.sender.is_closed());
            removed += before - list.len();
        }
        subscribers.retain(|_, list| !list.is_empty());
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().values().map(Vec::len).sum()
    }

    /// Drop every subscriber. Their receivers see the end of the stream.
    pub fn disconnect_all(&self) -> usize {
        let drained: Vec<_> = self.subscribers.lock().drain().collect();
        drained.iter().map(|(_, list)| list.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn broadcast_respects_where() {
        let registry = SubscriberRegistry::new(8);
        let mut all = registry.subscribe("Pet", None);
        let mut dogs = registry.subscribe("Pet", Some("species=dog".into()));
        let _other = registry.subscribe("Order", None);

        let items = vec![item(json!({"id": "1", "species": "dog"})), item(json!({"id": "2", "species": "cat"}))];
        assert_eq!(registry.broadcast("Pet", &items), 3);

        assert_eq!(all.receiver.recv().await, Some(LiveEvent::New(items[0].clone())));
        assert_eq!(all.receiver.recv().await, Some(LiveEvent::New(items[1].clone())));
        assert_eq!(dogs.receiver.recv().await, Some(LiveEvent::New(items[0].clone())));
        assert!(dogs.receiver.try_recv().is_err());
        assert_eq!(registry.content_types(), vec!["Order", "Pet"]);
    }

    #[tokio::test]
    async fn full_buffer_marks_disconnected() {
        let registry = SubscriberRegistry::new(1);
        let _slow = registry.subscribe("Pet", None);
        let items = vec![item(json!({"id": "1"})), item(json!({"id": "2"}))];
        assert_eq!(registry.broadcast("Pet", &items), 1);
        assert_eq!(registry.cleanup_disconnected(), 1);
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_is_cleaned_up() {
        let registry = SubscriberRegistry::new(4);
        let sub = registry.subscribe("Pet", None);
        drop(sub);
        assert_eq!(registry.broadcast("Pet", &[item(json!({"id": "1"}))]), 0);
        assert_eq!(registry.cleanup_disconnected(), 1);
        assert!(registry.content_types().is_empty());
    }

    #[test]
    fn unsubscribe_removes_entry() {
        let registry = SubscriberRegistry::new(4);
        let sub = registry.subscribe("Pet", None);
        assert_eq!(registry.subscriber_count(), 1);
        registry.unsubscribe(&sub.content_type, sub.id);
        assert_eq!(registry.subscriber_count(), 0);
        assert!(registry.content_types().is_empty());
    }

    #[tokio::test]
    async fn disconnect_all_ends_streams() {
        let registry = SubscriberRegistry::new(4);
        let mut a = registry.subscribe("Pet", None);
        let _b = registry.subscribe("Order", None);
        assert_eq!(registry.disconnect_all(), 2);
        assert_eq!(registry.subscriber_count(), 0);
        assert_eq!(a.receiver.recv().await, None);
    }
}
