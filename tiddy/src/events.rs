//! In-process publish/subscribe for ingestion events

use crate::interface::{NotificationEvent, NotificationEventSubscriber};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Subscriber registry. `publish` delivers synchronously on the calling
/// thread, in subscription order, without holding the lock.
pub(crate) struct EventBus {
    subscribers: RwLock<Vec<(u64, Arc<dyn NotificationEventSubscriber>)>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe(&self, subscriber: Arc<dyn NotificationEventSubscriber>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write().push((id, subscriber));
        id
    }

    pub(crate) fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub(crate) fn publish(&self, event: &NotificationEvent) {
        let subscribers: Vec<Arc<dyn NotificationEventSubscriber>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();

        for subscriber in subscribers {
            subscriber.on_event(event.clone());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Collect(Mutex<Vec<NotificationEvent>>);

    impl NotificationEventSubscriber for Collect {
        fn on_event(&self, event: NotificationEvent) {
            self.0.lock().push(event);
        }
    }

    fn removed(package: &str) -> NotificationEvent {
        NotificationEvent::Removed { package_name: package.into() }
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let a = Arc::new(Collect(Mutex::new(Vec::new())));
        let b = Arc::new(Collect(Mutex::new(Vec::new())));
        bus.subscribe(a.clone());
        bus.subscribe(b.clone());

        bus.publish(&removed("x"));
        assert_eq!(a.0.lock().as_slice(), &[removed("x")]);
        assert_eq!(b.0.lock().as_slice(), &[removed("x")]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let a = Arc::new(Collect(Mutex::new(Vec::new())));
        let id = bus.subscribe(a.clone());
        assert_eq!(bus.len(), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&removed("x"));
        assert!(a.0.lock().is_empty());
    }

    #[test]
    fn test_subscriber_may_subscribe_during_publish() {
        // Delivery happens outside the lock, so re-entrant registration is fine
        struct Reentrant(Arc<EventBus>, Mutex<u32>);
        impl NotificationEventSubscriber for Reentrant {
            fn on_event(&self, _event: NotificationEvent) {
                *self.1.lock() += 1;
                self.0.subscribe(Arc::new(Collect(Mutex::new(Vec::new()))));
            }
        }

        let bus = Arc::new(EventBus::new());
        let sub = Arc::new(Reentrant(bus.clone(), Mutex::new(0)));
        bus.subscribe(sub.clone());
        bus.publish(&removed("x"));
        assert_eq!(*sub.1.lock(), 1);
        assert_eq!(bus.len(), 2);
    }
}
