//! Fan-out of change notifications to connected clients.
//!
//! The broadcaster keeps a registry of subscribers, each owning a single-slot
//! inbox. Publishing never blocks: when a subscriber still has an undelivered
//! message the new one is dropped for that subscriber only. Clients only need
//! to know that something changed, so a pending notification already covers
//! the newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

/// Inbox capacity of every subscriber.
const INBOX_CAPACITY: usize = 1;

#[derive(Debug, Default)]
struct Registry {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<String>>>,
    next_id: AtomicU64,
}

impl Registry {
    /// Remove a subscriber. Dropping its sender closes the inbox; both happen
    /// under the registry lock so a concurrent publish never sees a closed
    /// inbox.
    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.lock();
        subscribers.remove(&id).is_some()
    }
}

/// Publish-subscribe hub shared by the watcher and every connection.
///
/// Cloning is cheap and every clone refers to the same registry.
#[derive(Debug, Clone, Default)]
pub struct Broadcaster {
    inner: Arc<Registry>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber with an empty single-slot inbox.
    pub fn subscribe(&self) -> Subscriber {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner.subscribers.lock().insert(id, tx);
        crate::debug_event!("broadcast", "subscribed", "#{id}");

        Subscriber {
            id,
            inbox: rx,
            registry: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Remove the subscriber from the registry and close its inbox.
    ///
    /// Further reads observe closure once any message already in the slot
    /// has been taken. Calling this again is a no-op.
    pub fn unsubscribe(&self, subscriber: &mut Subscriber) {
        if !subscriber.active {
            return;
        }
        if !Weak::ptr_eq(&subscriber.registry, &Arc::downgrade(&self.inner)) {
            // Belongs to another broadcaster; its own Drop cleans up.
            return;
        }

        self.inner.remove(subscriber.id);
        subscriber.close();
        crate::debug_event!("broadcast", "unsubscribed", "#{}", subscriber.id);
    }

    /// Offer `message` to every registered subscriber without blocking.
    ///
    /// Returns how many subscribers accepted it. Subscribers with a full
    /// inbox are skipped.
    pub fn publish(&self, message: &str) -> usize {
        let subscribers = self.inner.subscribers.lock();
        let mut delivered = 0;

        for (id, tx) in subscribers.iter() {
            match tx.try_send(message.to_owned()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    crate::debug_event!("broadcast", "dropped", "#{id} inbox full");
                }
                Err(TrySendError::Closed(_)) => {
                    crate::debug_event!("broadcast", "dropped", "#{id} inbox closed");
                }
            }
        }

        crate::debug_event!(
            "broadcast",
            "sent",
            "{message} to {delivered}/{} subscribers",
            subscribers.len()
        );
        delivered
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Handle for one registered listener.
///
/// Owned by exactly one delivery loop. Dropping the handle unsubscribes it.
#[derive(Debug)]
pub struct Subscriber {
    id: u64,
    inbox: mpsc::Receiver<String>,
    registry: Weak<Registry>,
    active: bool,
}

impl Subscriber {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next notification. `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbox.recv().await
    }

    /// Take a pending notification without waiting.
    pub fn try_recv(&mut self) -> Result<String, TryRecvError> {
        self.inbox.try_recv()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn close(&mut self) {
        self.active = false;
        self.inbox.close();
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_subscribe_registers() {
        let broadcaster = Broadcaster::new();
        let a = broadcaster.subscribe();
        let b = broadcaster.subscribe();

        assert_ne!(a.id(), b.id());
        assert_eq!(broadcaster.subscriber_count(), 2);
    }

    #[test]
    fn test_publish_does_not_block_on_full_inboxes() {
        let broadcaster = Broadcaster::new();
        let subscribers: Vec<_> = (0..500).map(|_| broadcaster.subscribe()).collect();

        let start = Instant::now();
        assert_eq!(broadcaster.publish("first.txt"), 500);
        // Every inbox is now full and nobody drains them
        for _ in 0..100 {
            assert_eq!(broadcaster.publish("again.txt"), 0);
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        drop(subscribers);
    }

    #[test]
    fn test_full_inbox_does_not_affect_others() {
        let broadcaster = Broadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        broadcaster.publish("one.txt");
        assert_eq!(b.try_recv().unwrap(), "one.txt");

        broadcaster.publish("two.txt");
        assert_eq!(b.try_recv().unwrap(), "two.txt");

        // A kept the first message, the second was dropped for A only
        assert_eq!(a.try_recv().unwrap(), "one.txt");
        assert!(matches!(a.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_inbox() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();

        broadcaster.unsubscribe(&mut sub);
        assert!(!sub.is_active());
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(sub.recv().await, None);

        // Publishing after removal never reaches the handle
        assert_eq!(broadcaster.publish("late.txt"), 0);
        assert!(matches!(sub.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();
        let _other = broadcaster.subscribe();

        broadcaster.unsubscribe(&mut sub);
        broadcaster.unsubscribe(&mut sub);
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let broadcaster = Broadcaster::new();
        {
            let _sub = broadcaster.subscribe();
            assert_eq!(broadcaster.subscriber_count(), 1);
        }
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_ignores_foreign_handle() {
        let first = Broadcaster::new();
        let second = Broadcaster::new();
        let mut sub = first.subscribe();

        second.unsubscribe(&mut sub);
        assert!(sub.is_active());
        assert_eq!(first.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_delivered_messages_keep_publish_order() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();

        for name in ["a.txt", "b.txt", "c.txt"] {
            broadcaster.publish(name);
            assert_eq!(sub.recv().await.as_deref(), Some(name));
        }
    }

    #[test]
    fn test_clones_share_registry() {
        let broadcaster = Broadcaster::new();
        let clone = broadcaster.clone();
        let mut sub = clone.subscribe();

        assert_eq!(broadcaster.publish("shared.txt"), 1);
        assert_eq!(sub.try_recv().unwrap(), "shared.txt");
    }
}
