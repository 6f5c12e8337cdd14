/// Event publishing methods
use super::core::Manager;
use crate::error::EventError;
use crate::event::{Event, EventValues};
use std::any::Any;
use std::rc::Rc;
use tracing::{debug, trace};

impl Manager {
    /// Publishes `event_name` with a fresh, empty [`Event`].
    ///
    /// Publishing an event nobody subscribed to is not an error; the untouched
    /// event is returned.
    pub fn publish(&self, event_name: &str) -> Result<Event, EventError> {
        self.publish_event(event_name, Event::new())
    }

    /// Builds an event from `subject` and `values`, then publishes it.
    pub fn publish_with(
        &self,
        event_name: &str,
        subject: Option<Rc<dyn Any>>,
        values: EventValues,
    ) -> Result<Event, EventError> {
        self.publish_event(event_name, Event::from_parts(subject, values))
    }

    /// Publishes a caller-supplied event and hands it back afterwards.
    ///
    /// Subscribers run highest priority first over a snapshot of the subscriber
    /// list taken when the call starts: subscriptions added or removed by
    /// subscriber code during the pass only affect later passes. A nested
    /// publish of the same event builds its own snapshot from the live state.
    ///
    /// The pass ends early once a subscriber calls
    /// [`Event::stop_propagation`]. Only-once subscriptions are removed right
    /// after their first successful invocation; one already consumed by a
    /// nested publish is skipped by the outer pass.
    ///
    /// # Errors
    ///
    /// The first error returned by a subscriber is returned unchanged and the
    /// remaining subscribers of this pass are skipped.
    pub fn publish_event(&self, event_name: &str, mut event: Event) -> Result<Event, EventError> {
        self.stats.borrow_mut().events_published += 1;

        let snapshot = self.sorted_entries(event_name);
        if snapshot.is_empty() {
            trace!("No subscribers for event: {}", event_name);
            return Ok(event);
        }
        trace!("📤 Publishing '{}' to {} subscribers", event_name, snapshot.len());

        for entry in &snapshot {
            if event.is_propagation_stopped() {
                break;
            }

            // A nested publish may already have delivered and removed it.
            if entry.only_once && !self.registry.borrow().contains_entry(event_name, entry) {
                trace!("Skipping only-once subscriber already consumed for '{}'", event_name);
                continue;
            }

            // Entries in a fresh snapshot are resolved; this only does work if a
            // reentrant rebuild was abandoned before reaching this entry.
            self.resolve_entry(event_name, entry);
            let Some(invocable) = entry.invocable() else {
                continue;
            };

            invocable.invoke(&mut event, event_name, self)?;
            self.stats.borrow_mut().deliveries += 1;

            if entry.only_once && self.registry.borrow_mut().remove_entry(event_name, entry) {
                debug!("🔂 Removed only-once subscriber {:?} from '{}'", invocable, event_name);
            }
        }

        if event.is_propagation_stopped() {
            self.stats.borrow_mut().propagation_stops += 1;
            debug!("⏹️ Propagation of '{}' stopped", event_name);
        }

        Ok(event)
    }
}
