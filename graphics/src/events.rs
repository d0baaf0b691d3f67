//! Typed publish/subscribe channels.
//!
//! An [`EventChannel`] fans each published event out to every live
//! [`Subscription`]. Subscriptions queue events until they are drained, so a
//! subscriber that only looks once per tick still sees everything that was
//! published since its last look.
//!
//! # Usage pattern
//!
//! 1. The producer owns an `EventChannel<MyEvent>`
//! 2. Consumers call [`EventChannel::subscribe`] once and keep the subscription
//! 3. The producer calls [`EventChannel::publish`]
//! 4. Consumers call [`Subscription::drain`] or [`Subscription::latest`]
//!
//! Dropping a subscription unsubscribes it.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Queue<E> = Mutex<VecDeque<E>>;

/// A typed event channel with any number of subscribers.
pub struct EventChannel<E: Clone + Send + 'static> {
    subscribers: Mutex<Vec<Weak<Queue<E>>>>,
}

impl<E: Clone + Send + 'static> EventChannel<E> {
    /// Creates a channel without subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Creates a new subscription that receives every event published from now on.
    pub fn subscribe(&self) -> Subscription<E> {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        self.subscribers.lock().push(Arc::downgrade(&queue));
        Subscription { queue }
    }

    /// Publishes an event to all live subscriptions.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn publish(&self, event: E) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|weak| weak.strong_count() > 0);
        let mut delivered = 0;
        for queue in subscribers.iter().filter_map(Weak::upgrade) {
            queue.lock().push_back(event.clone());
            delivered += 1;
        }
        delivered
    }

    /// Returns the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl<E: Clone + Send + 'static> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send + 'static> std::fmt::Debug for EventChannel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiving end of an [`EventChannel`].
pub struct Subscription<E> {
    queue: Arc<Queue<E>>,
}

impl<E> Subscription<E> {
    /// Removes and returns all pending events, oldest first.
    pub fn drain(&self) -> Vec<E> {
        self.queue.lock().drain(..).collect()
    }

    /// Removes all pending events and returns the most recent one.
    pub fn latest(&self) -> Option<E> {
        let mut queue = self.queue.lock();
        let latest = queue.pop_back();
        queue.clear();
        latest
    }

    /// Returns the number of pending events.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns true if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone)]
    struct TestEvent {
        value: u32,
    }

    #[test]
    fn publish_reaches_all_subscribers() {
        let channel = EventChannel::new();
        let a = channel.subscribe();
        let b = channel.subscribe();

        assert_eq!(channel.publish(TestEvent { value: 1 }), 2);

        assert_eq!(a.drain(), vec![TestEvent { value: 1 }]);
        assert_eq!(b.drain(), vec![TestEvent { value: 1 }]);
        assert!(a.is_empty());
    }

    #[test]
    fn events_before_subscribe_are_not_seen() {
        let channel = EventChannel::new();
        channel.publish(TestEvent { value: 1 });
        let sub = channel.subscribe();
        assert!(sub.is_empty());
    }

    #[test]
    fn latest_coalesces() {
        let channel = EventChannel::new();
        let sub = channel.subscribe();
        for value in 1..=3 {
            channel.publish(TestEvent { value });
        }
        assert_eq!(sub.pending(), 3);
        assert_eq!(sub.latest(), Some(TestEvent { value: 3 }));
        assert_eq!(sub.latest(), None);
    }

    #[test]
    fn dropped_subscription_unsubscribes() {
        let channel = EventChannel::new();
        let sub = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 1);
        drop(sub);
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.publish(TestEvent { value: 1 }), 0);
    }
}
