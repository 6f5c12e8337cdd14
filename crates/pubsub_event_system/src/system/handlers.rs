/// Subscription registration and lookup methods
use super::core::Manager;
use super::registry::SubscriptionEntry;
use crate::capability::{self, SubscriberInterface, SubscriptionMap};
use crate::error::EventError;
use crate::target::{Invocable, Target};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

impl Manager {
    /// Subscribes `target` to `event_name`.
    ///
    /// Subscribers with a higher `priority` run earlier; subscribers sharing a
    /// priority run in subscribe order. When `only_once` is set the subscription
    /// removes itself after its first successful invocation.
    ///
    /// Factory targets are stored as-is and only materialized the first time the
    /// event's subscriber list is built.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidTarget`] when the target is malformed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pubsub_event_system::{Manager, Target};
    ///
    /// let manager = Manager::new();
    /// manager.subscribe("user.created", Target::callback(|event, _name, _manager| {
    ///     event.set_value("welcomed", true);
    ///     Ok(())
    /// }), 10, false)?;
    ///
    /// let event = manager.publish("user.created")?;
    /// assert_eq!(event.value("welcomed"), Some(&serde_json::json!(true)));
    /// # Ok::<(), pubsub_event_system::EventError>(())
    /// ```
    pub fn subscribe(
        &self,
        event_name: &str,
        target: impl Into<Target>,
        priority: i32,
        only_once: bool,
    ) -> Result<(), EventError> {
        let target = target.into();
        target.validate()?;

        let lazy = target.is_factory();
        self.registry
            .borrow_mut()
            .insert(event_name, SubscriptionEntry::new(target, priority, only_once));

        debug!(
            event = event_name,
            priority,
            only_once,
            lazy,
            "📝 Subscribed to '{}'",
            event_name
        );
        Ok(())
    }

    /// Removes every subscription of `event_name` whose target matches `target`.
    ///
    /// A factory passed here is run once to obtain the value to compare against;
    /// the event's stored factories are resolved first, so a subscription can be
    /// removed by its factory or by the subscriber that factory produces.
    ///
    /// Returns the number of removed subscriptions. Unknown events are a no-op.
    pub fn unsubscribe(&self, event_name: &str, target: impl Into<Target>) -> usize {
        if !self.registry.borrow().has_subscribers(Some(event_name)) {
            return 0;
        }
        let needle = target.into().materialize(self);
        self.sorted_entries(event_name);

        let removed = self.registry.borrow_mut().remove_matching(event_name, &needle);
        debug!(
            event = event_name,
            removed,
            "🗑️ Unsubscribed {:?} from '{}'",
            needle,
            event_name
        );
        removed
    }

    /// Returns true when `event_name` has at least one subscription.
    ///
    /// Only the raw buckets are inspected: no factory is ever run here.
    pub fn has_subscribers(&self, event_name: &str) -> bool {
        self.registry.borrow().has_subscribers(Some(event_name))
    }

    /// Returns true when any event has at least one subscription.
    pub fn has_any_subscribers(&self) -> bool {
        self.registry.borrow().has_subscribers(None)
    }

    /// Returns the subscribers of `event_name`, highest priority first.
    ///
    /// Pending factories for the event are resolved and memoized.
    pub fn subscribers(&self, event_name: &str) -> Vec<Invocable> {
        self.sorted_entries(event_name)
            .iter()
            .filter_map(|entry| entry.invocable())
            .collect()
    }

    /// Returns the sorted subscribers of every event that still has any.
    pub fn all_subscribers(&self) -> IndexMap<String, Vec<Invocable>> {
        let event_names = self.registry.borrow().event_names();
        event_names
            .into_iter()
            .filter_map(|event_name| {
                let subscribers = self.subscribers(&event_name);
                (!subscribers.is_empty()).then_some((event_name, subscribers))
            })
            .collect()
    }

    /// Subscribes everything `interface` declares in [`SubscriberInterface::subscriptions`].
    ///
    /// Returns the normalized declaration so the caller can see exactly what was
    /// registered.
    ///
    /// # Errors
    ///
    /// [`EventError::Configuration`] if the declaration is not a map, an
    /// event's specification cannot be normalized, or a declared target is
    /// invalid (bad method name, method the object does not respond to).
    /// Nothing is subscribed then.
    pub fn add_subscriber_interface<S: SubscriberInterface>(
        &self,
        interface: &Rc<S>,
    ) -> Result<SubscriptionMap, EventError> {
        let subscriptions = capability::normalize(interface)?;

        // All-or-nothing: reject the whole declaration before touching the registry.
        for (event_name, infos) in &subscriptions {
            for info in infos {
                info.target.validate().map_err(|e| {
                    EventError::Configuration(format!(
                        "{}::subscriptions(): invalid subscriber defined for {}: {}",
                        interface.subscriber_name(),
                        event_name,
                        e
                    ))
                })?;
            }
        }

        for (event_name, infos) in &subscriptions {
            for info in infos {
                self.subscribe(event_name, info.target.clone(), info.priority, info.only_once)?;
            }
        }
        debug!(
            "📦 Added subscriber interface {} ({} events)",
            interface.subscriber_name(),
            subscriptions.len()
        );
        Ok(subscriptions)
    }

    /// Unsubscribes everything `interface` declares.
    ///
    /// The declaration is re-read and re-normalized, so this is the exact inverse
    /// of [`Manager::add_subscriber_interface`] as long as the declaration has
    /// not changed in between.
    ///
    /// # Errors
    ///
    /// [`EventError::Configuration`] under the same conditions as adding.
    pub fn remove_subscriber_interface<S: SubscriberInterface>(
        &self,
        interface: &Rc<S>,
    ) -> Result<SubscriptionMap, EventError> {
        let subscriptions = capability::normalize(interface)?;
        for (event_name, infos) in &subscriptions {
            for info in infos {
                self.unsubscribe(event_name, info.target.clone());
            }
        }
        debug!(
            "📦 Removed subscriber interface {} ({} events)",
            interface.subscriber_name(),
            subscriptions.len()
        );
        Ok(subscriptions)
    }
}
