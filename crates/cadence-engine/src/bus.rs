//! Synchronous publish/subscribe relay for trace signals.
//!
//! [`TraceBus`] is a direct call-through: `publish` invokes every
//! matching listener before it returns. There is no queue and no second
//! thread, so "model state changed" and "listener notified" happen in
//! the same virtual instant and in a reproducible order.

use indexmap::IndexMap;
use smallvec::SmallVec;

use cadence_core::{SignalKind, SubscriptionId, TraceSignal};

/// A subscriber callback.
pub type Listener = Box<dyn FnMut(&TraceSignal) + Send>;

/// Listeners for one kind, in subscription order. Most kinds have one
/// or two subscribers.
type ListenerList = SmallVec<[(SubscriptionId, Listener); 2]>;

/// Publish/subscribe relay keyed by [`SignalKind`].
///
/// Owned by the scheduler; handlers reach it through
/// [`SimContext`](crate::SimContext), which stamps every signal with the
/// dispatching event's time.
#[derive(Default)]
pub struct TraceBus {
    listeners: IndexMap<SignalKind, ListenerList>,
    next_id: u64,
}

impl TraceBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for signals of `kind`.
    ///
    /// Listeners of one kind run in the order they subscribed.
    pub fn subscribe<F>(&mut self, kind: SignalKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&TraceSignal) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(sid, _)| *sid == id) {
                drop(list.remove(pos));
                return true;
            }
        }
        false
    }

    /// Deliver `signal` to every listener of its kind, synchronously.
    /// Returns the number of listeners invoked.
    pub fn publish(&mut self, signal: &TraceSignal) -> usize {
        let Some(list) = self.listeners.get_mut(&signal.kind) else {
            return 0;
        };
        for (_, listener) in list.iter_mut() {
            listener(signal);
        }
        list.len()
    }

    /// Number of listeners registered for `kind`.
    pub fn subscriber_count(&self, kind: SignalKind) -> usize {
        self.listeners.get(&kind).map_or(0, |l| l.len())
    }
}

impl std::fmt::Debug for TraceBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<(SignalKind, usize)> = self
            .listeners
            .iter()
            .map(|(k, l)| (*k, l.len()))
            .collect();
        f.debug_struct("TraceBus")
            .field("listeners", &counts)
            .finish()
    }
}
