//! Listener registry — per-event fan-out with fault isolation.
//!
//! Listeners are registered against an [`EventKind`] and removed through
//! the [`ListenerHandle`] returned at registration. Handles are the only
//! unregistration currency: the typed helpers (`on_price_alert` etc.)
//! install filtering wrappers internally, and a handle stays valid no
//! matter how the listener was wrapped.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::domain::notification::{AppNotification, MarketUpdateNotification, PriceAlertNotification};
use crate::ws::{ConnectionStatus, ErrorPayload, EventKind, PongPayload, SessionEvent};

type Callback = dyn Fn(&SessionEvent) + Send + Sync;

/// Stable handle to one registration. Returned by every `on*` method;
/// pass it to [`EventRegistry::off`] to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    kind: EventKind,
    id: u64,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    /// Registration order is preserved per kind — emit walks the Vec.
    listeners: HashMap<EventKind, Vec<(u64, Arc<Callback>)>>,
}

/// Per-event-kind listener multiplexer.
#[derive(Default)]
pub struct EventRegistry {
    inner: Mutex<Inner>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw listener for one event kind.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&SessionEvent) + Send + Sync + 'static,
    ) -> ListenerHandle {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        ListenerHandle { kind, id }
    }

    /// Remove a registration. Unknown or already-removed handles are a
    /// no-op, never an error.
    pub fn off(&self, handle: ListenerHandle) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        if let Some(list) = inner.listeners.get_mut(&handle.kind) {
            list.retain(|(id, _)| *id != handle.id);
        }
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .listeners
            .clear();
    }

    /// Number of live registrations across all kinds.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .listeners
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispatch an event to every listener for its kind, in registration
    /// order. Invoked only by the session task.
    ///
    /// A panicking listener is caught and logged; it neither stops the
    /// remaining listeners nor escapes this call. The lock is released
    /// before any callback runs, so listeners may call `on`/`off` freely.
    pub(crate) fn emit(&self, event: &SessionEvent) {
        let callbacks: Vec<Arc<Callback>> = {
            let inner = self.inner.lock().expect("registry lock poisoned");
            match inner.listeners.get(&event.kind()) {
                Some(list) => list.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return,
            }
        };

        for callback in callbacks {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                let message = panic_message(&panic);
                tracing::error!(event = ?event.kind(), "Listener panicked: {}", message);
            }
        }
    }

    // ─── Typed helpers ───────────────────────────────────────────────────

    /// Listen for every notification, regardless of its type.
    pub fn on_notification(
        &self,
        callback: impl Fn(&AppNotification) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.on(EventKind::Notification, move |event| {
            if let SessionEvent::Notification(n) = event {
                callback(n);
            }
        })
    }

    /// Listen for `price_alert` notifications only, parsed into their
    /// specialized shape.
    pub fn on_price_alert(
        &self,
        callback: impl Fn(&PriceAlertNotification) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.on(EventKind::Notification, move |event| {
            if let SessionEvent::Notification(n) = event {
                if let Some(alert) = n.as_price_alert() {
                    callback(&alert);
                }
            }
        })
    }

    pub fn on_market_update(
        &self,
        callback: impl Fn(&MarketUpdateNotification) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.on(EventKind::MarketUpdate, move |event| {
            if let SessionEvent::MarketUpdate(m) = event {
                callback(m);
            }
        })
    }

    pub fn on_connection_status(
        &self,
        callback: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.on(EventKind::ConnectionStatus, move |event| {
            if let SessionEvent::ConnectionStatus(status) = event {
                callback(status);
            }
        })
    }

    pub fn on_error(
        &self,
        callback: impl Fn(&ErrorPayload) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.on(EventKind::Error, move |event| {
            if let SessionEvent::Error(e) = event {
                callback(e);
            }
        })
    }

    pub fn on_pong(
        &self,
        callback: impl Fn(&PongPayload) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.on(EventKind::Pong, move |event| {
            if let SessionEvent::Pong(p) = event {
                callback(p);
            }
        })
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}
