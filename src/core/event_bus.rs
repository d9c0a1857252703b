//! In-process publish/subscribe for domain events.
//!
//! Delivery is synchronous and limited to the subscribers registered at
//! publish time. There is no buffering, retry or persistence: relaying
//! events to remote observers is the transport layer's job.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::DomainEvent;

/// Subscribing under this name receives every event
pub const ALL_EVENTS: &str = "*";

/// Callback type for event handlers
pub type EventHandler = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    handler: EventHandler,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
}

/// Cloneable handle to a shared event bus
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Create an event bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events named `name` (or `ALL_EVENTS`)
    pub fn subscribe<F>(&self, name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        subscribers
            .entry(name.to_string())
            .or_default()
            .push(Subscriber {
                id,
                handler: Arc::new(handler),
            });

        id
    }

    /// Subscribe and receive events through an unbounded channel.
    ///
    /// The subscription lives until the receiver is dropped and the next
    /// matching event is published.
    pub fn subscribe_channel(&self, name: &str) -> mpsc::UnboundedReceiver<DomainEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let bus = Arc::downgrade(&self.inner);
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let handler_slot = Arc::clone(&slot);

        let id = self.subscribe(name, move |event| {
            if tx.send(event.clone()).is_err() {
                let id = *handler_slot.lock().unwrap_or_else(PoisonError::into_inner);
                if let (Some(id), Some(inner)) = (id, bus.upgrade()) {
                    EventBus { inner }.unsubscribe(id);
                }
            }
        });
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);

        rx
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut removed = false;
        subscribers.retain(|_, list| {
            let before = list.len();
            list.retain(|s| s.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Publish an event to every current subscriber of `name`
    pub fn publish(&self, name: &str, payload: Value) {
        self.publish_event(DomainEvent::new(name, payload));
    }

    /// Publish an already-built event (used to forward stack events as-is)
    pub fn publish_event(&self, event: DomainEvent) {
        // Handlers run outside the lock so they may subscribe or publish.
        let handlers: Vec<EventHandler> = {
            let subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let keys: &[&str] = if event.name == ALL_EVENTS {
                &[ALL_EVENTS]
            } else {
                &[event.name.as_str(), ALL_EVENTS]
            };

            keys.iter()
                .filter_map(|key| subscribers.get(*key))
                .flatten()
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        debug!(event = %event.name, subscribers = handlers.len(), "Publishing event");

        for handler in handlers {
            handler(&event);
        }
    }

    /// Number of subscribers registered for exactly `name`
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, Vec::len)
    }
}
