/// Subscription storage: priority buckets per event plus the sorted-view cache
use crate::target::{Factory, Invocable, Target};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// One registered subscription.
///
/// The target lives in its own slot so a factory can be swapped for the
/// subscriber it produced without touching the bucket that owns the entry.
pub(crate) struct SubscriptionEntry {
    target: RefCell<Target>,
    pub(crate) priority: i32,
    pub(crate) only_once: bool,
}

impl SubscriptionEntry {
    pub(crate) fn new(target: Target, priority: i32, only_once: bool) -> Rc<Self> {
        Rc::new(Self {
            target: RefCell::new(target),
            priority,
            only_once,
        })
    }

    /// Returns a clone of the factory while the entry is still unresolved.
    pub(crate) fn pending_factory(&self) -> Option<Factory> {
        match &*self.target.borrow() {
            Target::Factory(factory) => Some(factory.clone()),
            Target::Direct(_) => None,
        }
    }

    /// Writes a resolved target into the slot. Returns false if another
    /// resolution got there first, in which case the earlier result is kept.
    pub(crate) fn memoize(&self, resolved: Invocable) -> bool {
        let mut slot = self.target.borrow_mut();
        if slot.is_factory() {
            *slot = Target::Direct(resolved);
            true
        } else {
            false
        }
    }

    /// The resolved invocable, or `None` while the entry still holds a factory.
    pub(crate) fn invocable(&self) -> Option<Invocable> {
        self.target.borrow().as_invocable().cloned()
    }

    fn matches(&self, needle: &Invocable) -> bool {
        self.target
            .borrow()
            .as_invocable()
            .is_some_and(|invocable| invocable == needle)
    }
}

type Buckets = BTreeMap<i32, Vec<Rc<SubscriptionEntry>>>;

/// Raw subscription state owned by the manager.
///
/// Invariants:
/// - within a priority bucket, entries keep subscribe order;
/// - an event with no entries has no key in `buckets`;
/// - `sorted[e]` is absent or equals `buckets[e]` flattened by descending
///   priority, and every structural change to `buckets[e]` removes it.
#[derive(Default)]
pub(crate) struct Registry {
    buckets: IndexMap<String, Buckets>,
    sorted: HashMap<String, Vec<Rc<SubscriptionEntry>>>,
    revision: u64,
}

impl Registry {
    /// Appends an entry to its priority bucket.
    pub(crate) fn insert(&mut self, event_name: &str, entry: Rc<SubscriptionEntry>) {
        self.buckets
            .entry(event_name.to_string())
            .or_default()
            .entry(entry.priority)
            .or_default()
            .push(entry);
        self.invalidate(event_name);
    }

    /// Existence check over the raw buckets. Never touches the sorted view.
    pub(crate) fn has_subscribers(&self, event_name: Option<&str>) -> bool {
        match event_name {
            Some(name) => self.buckets.contains_key(name),
            None => !self.buckets.is_empty(),
        }
    }

    /// Event names with at least one entry, in first-subscribe order.
    pub(crate) fn event_names(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }

    /// Total number of registered entries across all events.
    pub(crate) fn len(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|buckets| buckets.values())
            .map(Vec::len)
            .sum()
    }

    /// Bumped on every structural change.
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn cached(&self, event_name: &str) -> Option<Vec<Rc<SubscriptionEntry>>> {
        self.sorted.get(event_name).cloned()
    }

    /// Flattens an event's buckets: highest priority first, FIFO within a priority.
    pub(crate) fn flatten(&self, event_name: &str) -> Vec<Rc<SubscriptionEntry>> {
        self.buckets
            .get(event_name)
            .map(|buckets| {
                buckets
                    .iter()
                    .rev()
                    .flat_map(|(_, entries)| entries.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stores a sorted view, unless the registry changed since it was flattened.
    pub(crate) fn store_sorted(
        &mut self,
        event_name: &str,
        entries: Vec<Rc<SubscriptionEntry>>,
        flattened_at: u64,
    ) -> bool {
        if flattened_at != self.revision || !self.buckets.contains_key(event_name) {
            return false;
        }
        self.sorted.insert(event_name.to_string(), entries);
        true
    }

    /// Removes every entry whose resolved target matches `needle`.
    pub(crate) fn remove_matching(&mut self, event_name: &str, needle: &Invocable) -> usize {
        let Some(buckets) = self.buckets.get_mut(event_name) else {
            return 0;
        };
        let mut removed = 0;
        for entries in buckets.values_mut() {
            let before = entries.len();
            entries.retain(|entry| !entry.matches(needle));
            removed += before - entries.len();
        }
        if removed > 0 {
            self.prune(event_name);
            self.invalidate(event_name);
        }
        removed
    }

    /// Returns true while `entry` itself is still registered under `event_name`.
    pub(crate) fn contains_entry(&self, event_name: &str, entry: &Rc<SubscriptionEntry>) -> bool {
        self.buckets
            .get(event_name)
            .and_then(|buckets| buckets.get(&entry.priority))
            .is_some_and(|entries| entries.iter().any(|candidate| Rc::ptr_eq(candidate, entry)))
    }

    /// Removes exactly `entry`, if it is still registered.
    pub(crate) fn remove_entry(&mut self, event_name: &str, entry: &Rc<SubscriptionEntry>) -> bool {
        let Some(entries) = self
            .buckets
            .get_mut(event_name)
            .and_then(|buckets| buckets.get_mut(&entry.priority))
        else {
            return false;
        };
        let Some(position) = entries.iter().position(|candidate| Rc::ptr_eq(candidate, entry)) else {
            return false;
        };
        entries.remove(position);
        self.prune(event_name);
        self.invalidate(event_name);
        true
    }

    /// Drops empty priority buckets, then the event itself once it has none.
    fn prune(&mut self, event_name: &str) {
        let now_empty = match self.buckets.get_mut(event_name) {
            Some(buckets) => {
                buckets.retain(|_, entries| !entries.is_empty());
                buckets.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.buckets.shift_remove(event_name);
        }
    }

    fn invalidate(&mut self, event_name: &str) {
        self.sorted.remove(event_name);
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(priority: i32) -> Rc<SubscriptionEntry> {
        SubscriptionEntry::new(Target::callback(|_, _, _| Ok(())), priority, false)
    }

    fn priorities(entries: &[Rc<SubscriptionEntry>]) -> Vec<i32> {
        entries.iter().map(|e| e.priority).collect()
    }

    #[test]
    fn test_flatten_orders_by_descending_priority_then_fifo() {
        let mut registry = Registry::default();
        let first_zero = entry(0);
        let second_zero = entry(0);
        registry.insert("foo", entry(-10));
        registry.insert("foo", first_zero.clone());
        registry.insert("foo", entry(10));
        registry.insert("foo", second_zero.clone());

        let flat = registry.flatten("foo");
        assert_eq!(priorities(&flat), vec![10, 0, 0, -10]);
        assert!(Rc::ptr_eq(&flat[1], &first_zero));
        assert!(Rc::ptr_eq(&flat[2], &second_zero));
    }

    #[test]
    fn test_store_sorted_rejects_stale_view() {
        let mut registry = Registry::default();
        registry.insert("foo", entry(0));

        let revision = registry.revision();
        let view = registry.flatten("foo");
        registry.insert("foo", entry(5));

        assert!(!registry.store_sorted("foo", view, revision));
        assert!(registry.cached("foo").is_none());

        let revision = registry.revision();
        let view = registry.flatten("foo");
        assert!(registry.store_sorted("foo", view, revision));
        assert_eq!(priorities(&registry.cached("foo").unwrap()), vec![5, 0]);
    }

    #[test]
    fn test_insert_invalidates_cache() {
        let mut registry = Registry::default();
        registry.insert("foo", entry(0));
        let revision = registry.revision();
        let view = registry.flatten("foo");
        registry.store_sorted("foo", view, revision);

        registry.insert("foo", entry(1));
        assert!(registry.cached("foo").is_none());
    }

    #[test]
    fn test_remove_entry_is_exact_and_prunes() {
        let mut registry = Registry::default();
        let a = entry(3);
        let b = entry(3);
        registry.insert("foo", a.clone());
        registry.insert("foo", b.clone());

        assert!(registry.contains_entry("foo", &a));
        assert!(registry.remove_entry("foo", &a));
        assert!(!registry.contains_entry("foo", &a));
        assert!(registry.contains_entry("foo", &b));
        assert!(!registry.remove_entry("foo", &a));
        assert!(Rc::ptr_eq(&registry.flatten("foo")[0], &b));

        assert!(registry.remove_entry("foo", &b));
        assert!(!registry.has_subscribers(Some("foo")));
        assert!(!registry.has_subscribers(None));
        assert!(registry.event_names().is_empty());
    }

    #[test]
    fn test_remove_matching_removes_all_duplicates() {
        let mut registry = Registry::default();
        let shared = Invocable::callback(|_, _, _| Ok(()));
        registry.insert("foo", SubscriptionEntry::new(shared.clone().into(), 0, false));
        registry.insert("foo", SubscriptionEntry::new(shared.clone().into(), 7, true));
        registry.insert("foo", entry(0));

        assert_eq!(registry.remove_matching("foo", &shared), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.remove_matching("missing", &shared), 0);
    }

    #[test]
    fn test_memoize_keeps_first_resolution() {
        let factory_entry = SubscriptionEntry::new(
            crate::target::Factory::callable(|_| crate::target::callback(|_, _, _| Ok(()))).into(),
            0,
            false,
        );
        assert!(factory_entry.pending_factory().is_some());
        assert!(factory_entry.invocable().is_none());

        let first = Invocable::callback(|_, _, _| Ok(()));
        assert!(factory_entry.memoize(first.clone()));
        assert!(!factory_entry.memoize(Invocable::callback(|_, _, _| Ok(()))));
        assert_eq!(factory_entry.invocable(), Some(first));
        assert!(factory_entry.pending_factory().is_none());
    }
}
