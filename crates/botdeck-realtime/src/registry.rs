//! Per-event-type handler registry and dispatch.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::EventKind;

/// A subscriber callback, invoked with an event's payload.
///
/// Handlers are compared by `Arc` identity: subscribing the same `Arc`
/// twice is a no-op, and unsubscribing requires the original `Arc`.
pub type Handler = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Registry mapping event types to their subscriber callbacks.
///
/// Entries are created lazily on first subscribe. Dispatch runs handlers
/// synchronously in registration order; a panicking handler is isolated
/// so its siblings and future dispatches are unaffected.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`. Duplicate registration of the same
    /// callback is detected and ignored with a warning.
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) {
        let entry = self.handlers.entry(kind).or_default();
        if entry.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            warn!(event = %kind, "handler already subscribed, ignoring");
            return;
        }
        entry.push(handler);
    }

    /// Remove `handler` from `kind`'s subscriber list. No-op when absent.
    pub fn unsubscribe(&mut self, kind: EventKind, handler: &Handler) {
        if let Some(entry) = self.handlers.get_mut(&kind) {
            let before = entry.len();
            entry.retain(|h| !Arc::ptr_eq(h, handler));
            if entry.len() == before {
                debug!(event = %kind, "unsubscribe for unregistered handler, ignoring");
            }
        }
    }

    /// Invoke every handler registered for `kind`, in registration order,
    /// with `payload` unchanged. Dispatch to an empty set is a no-op.
    pub fn dispatch(&self, kind: EventKind, payload: &serde_json::Value) {
        let Some(entry) = self.handlers.get(&kind) else {
            return;
        };
        for handler in entry {
            if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
                warn!(event = %kind, "event handler panicked during dispatch");
            }
        }
    }

    /// Number of handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Drop every registered handler.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
