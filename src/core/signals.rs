//! In-memory publish/subscribe for decorative side effects.
//!
//! The bus carries no data and keeps no history: `emit` reaches whoever is
//! subscribed at that moment. Each [`SignalBus`] is an explicit instance
//! handed to the components that need it; clones share one registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// A user message was submitted and the request is being dispatched.
    ResponseStarted,
    /// The request cycle reached a terminal state, successful or not.
    ResponseFinished,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::ResponseStarted => "responseStarted",
            Signal::ResponseFinished => "responseFinished",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type SignalHandler = Arc<dyn Fn(Signal) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    handlers: HashMap<Signal, Vec<(SubscriptionId, SignalHandler)>>,
}

#[derive(Clone, Default)]
pub struct SignalBus {
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A handler that panicked mid-registration leaves the map intact.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn on<F>(&self, signal: Signal, handler: F) -> SubscriptionId
    where
        F: Fn(Signal) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry()
            .handlers
            .entry(signal)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns `false` when the handler was not registered for `signal`.
    pub fn off(&self, signal: Signal, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        let Some(handlers) = registry.handlers.get_mut(&signal) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            registry.handlers.remove(&signal);
        }
        removed
    }

    /// Register `handler` for as long as the returned guard lives.
    pub fn subscribe<F>(&self, signal: Signal, handler: F) -> Subscription
    where
        F: Fn(Signal) + Send + Sync + 'static,
    {
        let id = self.on(signal, handler);
        Subscription {
            bus: self.clone(),
            signal,
            id,
        }
    }

    /// Invoke the handlers registered for `signal`, in registration order.
    ///
    /// The handler list is copied before the first call, so handlers may
    /// register or deregister without deadlocking; such changes apply from
    /// the next emit. Panics raised by a handler propagate to the caller.
    pub fn emit(&self, signal: Signal) {
        let handlers: Vec<SignalHandler> = self
            .registry()
            .handlers
            .get(&signal)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        tracing::debug!(signal = %signal, listeners = handlers.len(), "Emitting signal");
        for handler in handlers {
            handler(signal);
        }
    }

    pub fn listener_count(&self, signal: Signal) -> usize {
        self.registry()
            .handlers
            .get(&signal)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Deregisters its handler when dropped.
pub struct Subscription {
    bus: SignalBus,
    signal: Signal,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.off(self.signal, self.id);
    }
}
