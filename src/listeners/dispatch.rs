//! Fan-out of event batches to registered listeners.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use super::error::ListenerFailure;
use super::events::{CacheEvent, EventKind};
use super::registry::{ListenerHandle, ListenerRegistry};

const METRIC_DISPATCH_BATCHES: &str = "cachewire_dispatch_batches_total";
const METRIC_DISPATCH_EVENTS: &str = "cachewire_dispatch_events_total";
const METRIC_LISTENER_FAILURES: &str = "cachewire_listener_failures_total";

/// Broadcasts batches to every listener registered for the batch's kind.
///
/// Cheap to clone; all clones share the same frozen registry. This is the
/// composite listener the runtime obtains through the listener factory
/// reference in each cache's policy.
#[derive(Debug, Clone)]
pub struct ListenerDispatcher {
    registry: Arc<ListenerRegistry>,
}

impl ListenerDispatcher {
    pub fn new(registry: Arc<ListenerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    /// Deliver `events` to each listener for `kind`, in registration order.
    ///
    /// A failing or panicking listener is logged and skipped; the remaining
    /// listeners still receive the batch.
    pub fn dispatch(&self, kind: EventKind, events: &[CacheEvent]) {
        self.deliver(kind, events, |_, _| {});
    }

    /// Like [`dispatch`](Self::dispatch), returning the failures it recorded.
    pub fn dispatch_report(&self, kind: EventKind, events: &[CacheEvent]) -> Vec<ListenerFailure> {
        let mut failures = Vec::new();
        self.deliver(kind, events, |listener, reason| {
            failures.push(ListenerFailure {
                listener: listener.to_string(),
                kind,
                cache: events[0].cache.clone(),
                reason,
            });
        });
        failures
    }

    fn deliver<F>(&self, kind: EventKind, events: &[CacheEvent], mut on_failure: F)
    where
        F: FnMut(&str, String),
    {
        let Some(first) = events.first() else {
            return;
        };

        let listeners = self.registry.listeners(kind);
        let cache = first.cache.as_str();

        counter!(METRIC_DISPATCH_BATCHES, "kind" => kind.as_str()).increment(1);
        counter!(METRIC_DISPATCH_EVENTS, "kind" => kind.as_str()).increment(events.len() as u64);
        debug!(
            kind = %kind,
            cache,
            events = events.len(),
            listeners = listeners.len(),
            "Dispatching cache event batch"
        );

        for listener in listeners {
            if let Err(reason) = invoke(listener, events) {
                counter!(METRIC_LISTENER_FAILURES, "kind" => kind.as_str()).increment(1);
                warn!(
                    listener = listener.name(),
                    kind = %kind,
                    cache,
                    reason = %reason,
                    "Cache entry listener failed; continuing with remaining listeners"
                );
                on_failure(listener.name(), reason);
            }
        }
    }

    pub fn on_created(&self, events: &[CacheEvent]) {
        self.dispatch(EventKind::Created, events);
    }

    pub fn on_updated(&self, events: &[CacheEvent]) {
        self.dispatch(EventKind::Updated, events);
    }

    pub fn on_expired(&self, events: &[CacheEvent]) {
        self.dispatch(EventKind::Expired, events);
    }

    pub fn on_removed(&self, events: &[CacheEvent]) {
        self.dispatch(EventKind::Removed, events);
    }
}

fn invoke(listener: &ListenerHandle, events: &[CacheEvent]) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(|| listener.call(events))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
