use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use mtap_models::{Event, EventKind};
use tracing::{debug, error};

/// Future returned by a single handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A subscriber callback. Receives the event by value; nothing is ever
/// propagated back to the publisher.
pub type Handler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

struct Subscription {
    name: String,
    handler: Handler,
}

impl Clone for Subscription {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// In-process publish/subscribe registry mapping event kinds to ordered
/// subscriber lists.
///
/// Dispatch is sequential in registration order: `publish` awaits each
/// handler before invoking the next, so downstream effects of one publish
/// complete before its siblings run. Handlers are isolated from each other:
/// an error or panic in one is logged and the remaining handlers still run.
pub struct EventBus {
    subscribers: Mutex<HashMap<EventKind, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Append `handler` to the subscriber list for `kind`. `name` identifies
    /// the subscriber in dispatch-failure logs.
    pub fn register(&self, kind: EventKind, name: impl Into<String>, handler: Handler) {
        let mut subscribers = self.lock_subscribers();
        subscribers.entry(kind).or_default().push(Subscription {
            name: name.into(),
            handler,
        });
    }

    /// Dispatch `event` to every currently-registered handler for its kind.
    ///
    /// Publishing a kind with zero subscribers is a silent no-op. The
    /// subscriber list is snapshotted before dispatch, so handlers may
    /// themselves publish without deadlocking the registry.
    pub async fn publish(&self, event: Event) {
        let kind = event.kind();
        let subscriptions: Vec<Subscription> = {
            let subscribers = self.lock_subscribers();
            subscribers.get(&kind).cloned().unwrap_or_default()
        };

        if subscriptions.is_empty() {
            debug!(kind = %kind, session = %event.session_id(), "No subscribers for event");
            return;
        }

        for subscription in subscriptions {
            let future = (subscription.handler)(event.clone());
            // Each handler runs in its own task so a panic is contained the
            // same way an error is.
            match tokio::spawn(future).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(
                        kind = %kind,
                        handler = %subscription.name,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(e) => {
                    error!(
                        kind = %kind,
                        handler = %subscription.name,
                        error = %e,
                        "Event handler panicked"
                    );
                }
            }
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock_subscribers()
            .get(&kind)
            .map_or(0, |subs| subs.len())
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, HashMap<EventKind, Vec<Subscription>>> {
        // The registry is a plain map; it stays consistent even if a prior
        // holder panicked, so recover rather than unwind.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
