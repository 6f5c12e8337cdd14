/// Core Manager implementation
use super::registry::{Registry, SubscriptionEntry};
use super::stats::DispatchStats;
use crate::target::Invocable;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// The publish/subscribe manager: subscription registry and dispatcher in one.
///
/// Subscribers register interest in named events with a target, a priority and
/// an optional only-once flag. [`Manager::publish`] later calls every matching
/// subscriber, highest priority first, passing a mutable [`Event`](crate::Event).
///
/// The manager is strictly single-threaded and every subscriber receives a
/// shared reference to it, so subscriber code may subscribe, unsubscribe or
/// publish again while a dispatch pass is running. Internal state is therefore
/// kept behind `RefCell`s, and no borrow is ever held while user code runs.
pub struct Manager {
    /// Priority buckets and the memoized sorted views
    pub(super) registry: RefCell<Registry>,
    /// Dispatch counters
    pub(super) stats: RefCell<DispatchStats>,
    /// Set once the reserved shutdown event has been published
    pub(crate) shutdown_published: Cell<bool>,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("Manager")
            .field("events", &registry.event_names())
            .field("subscriptions", &registry.len())
            .field("shutdown_published", &self.shutdown_published.get())
            .finish()
    }
}

impl Manager {
    /// Creates a manager with no subscriptions.
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(Registry::default()),
            stats: RefCell::new(DispatchStats::default()),
            shutdown_published: Cell::new(false),
        }
    }

    /// Returns a snapshot of the dispatch counters.
    pub fn stats(&self) -> DispatchStats {
        let mut stats = self.stats.borrow().clone();
        stats.total_subscriptions = self.registry.borrow().len();
        stats
    }

    /// Returns the sorted subscriber list for `event_name`, building and
    /// caching it when needed. Building resolves any pending factories.
    ///
    /// The returned vector is an owned snapshot: later registry mutations do not
    /// change it.
    pub(super) fn sorted_entries(&self, event_name: &str) -> Vec<Rc<SubscriptionEntry>> {
        if let Some(cached) = self.registry.borrow().cached(event_name) {
            return cached;
        }

        let (entries, flattened_at) = {
            let registry = self.registry.borrow();
            (registry.flatten(event_name), registry.revision())
        };
        if entries.is_empty() {
            return entries;
        }

        trace!("🔃 Building sorted view for '{}' ({} entries)", event_name, entries.len());
        for entry in &entries {
            self.resolve_entry(event_name, entry);
        }

        // A factory may have subscribed or unsubscribed while running; only a view
        // flattened from the current state is worth keeping.
        let stored = self
            .registry
            .borrow_mut()
            .store_sorted(event_name, entries.clone(), flattened_at);
        if !stored {
            trace!("Sorted view for '{}' went stale while resolving; not cached", event_name);
        }
        entries
    }

    /// Materializes a factory entry in place. No-op for resolved entries.
    pub(super) fn resolve_entry(&self, event_name: &str, entry: &SubscriptionEntry) {
        let Some(factory) = entry.pending_factory() else {
            return;
        };
        // The producer runs with no registry borrow held so it may use the manager.
        let resolved: Invocable = factory.produce(self);
        if entry.memoize(resolved) {
            self.stats.borrow_mut().factories_resolved += 1;
            debug!("🏭 Resolved lazy subscriber for '{}'", event_name);
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
