//! # Event Values
//!
//! The [`Event`] is the mutable context handed to every subscriber during a
//! dispatch pass. It carries an optional subject, an insertion-ordered bag of
//! named values, and the one-way propagation-stop flag.
//!
//! Values are stored as [`serde_json::Value`] so subscribers can exchange any
//! JSON-shaped data without agreeing on a concrete Rust type up front.

use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

/// Insertion-ordered value storage used by [`Event`].
pub type EventValues = IndexMap<String, Value>;

static NULL: Value = Value::Null;

/// Mutable event object passed through a dispatch pass.
///
/// Created by the publisher (or by the manager when the publisher does not
/// supply one) and returned from `publish` once every subscriber has run or
/// propagation was stopped.
///
/// # Examples
///
/// ```rust
/// use pubsub_event_system::Event;
/// use serde_json::json;
///
/// let mut event = Event::new();
/// event.set_value("user", "alice");
/// event["attempts"] = json!(3);
/// assert_eq!(event.value("user"), Some(&json!("alice")));
/// assert!(!event.is_propagation_stopped());
/// ```
#[derive(Clone, Default)]
pub struct Event {
    subject: Option<Rc<dyn Any>>,
    values: EventValues,
    propagation_stopped: bool,
}

impl Event {
    /// Creates an event without a subject and with no values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event about `subject`.
    pub fn with_subject<S: Any>(subject: S) -> Self {
        Self {
            subject: Some(Rc::new(subject)),
            ..Self::default()
        }
    }

    /// Creates an event from an optional shared subject and initial values.
    pub fn from_parts(subject: Option<Rc<dyn Any>>, values: EventValues) -> Self {
        Self {
            subject,
            values,
            propagation_stopped: false,
        }
    }

    /// Builder-style variant of [`Event::set_values`].
    pub fn with_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.values = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    /// Returns the subject this event is about, if any.
    pub fn subject(&self) -> Option<&Rc<dyn Any>> {
        self.subject.as_ref()
    }

    /// Returns the subject downcast to `T`, or `None` when absent or of another type.
    pub fn subject_as<T: Any>(&self) -> Option<&T> {
        self.subject.as_ref().and_then(|subject| subject.downcast_ref::<T>())
    }

    /// Returns the value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns true when a value is stored under `key`, even if it is null.
    pub fn has_value(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns true when `key` holds a non-null value.
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(value) if !value.is_null())
    }

    /// Stores `value` under `key`. Existing keys keep their position.
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Removes the value stored under `key`, preserving the order of the rest.
    pub fn remove_value(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    /// Appends `value` under the next free integer key and returns that key.
    ///
    /// The next key is one past the largest non-negative integer key currently
    /// stored, or `0` when there is none.
    pub fn push(&mut self, value: impl Into<Value>) -> String {
        let next = self
            .values
            .keys()
            .filter_map(|key| integer_key(key))
            .max()
            .map_or(0, |max| max + 1);
        let key = next.to_string();
        self.values.insert(key.clone(), value.into());
        key
    }

    /// Returns every stored value in insertion order.
    pub fn values(&self) -> &EventValues {
        &self.values
    }

    /// Replaces the entire value map.
    pub fn set_values(&mut self, values: EventValues) {
        self.values = values;
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.values.iter()
    }

    /// Halts delivery to the remaining subscribers of the current pass.
    ///
    /// The flag is never reset by the manager.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Returns true once [`Event::stop_propagation`] has been called.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Parses keys in canonical integer form ("0", "17"), rejecting "007" or "-1".
fn integer_key(key: &str) -> Option<i64> {
    let parsed = key.parse::<i64>().ok().filter(|n| *n >= 0)?;
    (parsed.to_string() == key).then_some(parsed)
}

impl Index<&str> for Event {
    type Output = Value;

    /// Missing keys read as `null`.
    fn index(&self, key: &str) -> &Value {
        self.values.get(key).unwrap_or(&NULL)
    }
}

impl IndexMut<&str> for Event {
    /// Missing keys are inserted as `null` before being handed out.
    fn index_mut(&mut self, key: &str) -> &mut Value {
        self.values.entry(key.to_string()).or_insert(Value::Null)
    }
}

impl<'a> IntoIterator for &'a Event {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("propagation_stopped", &self.propagation_stopped)
            .field("subject", &self.subject.is_some())
            .field("values", &self.values)
            .finish()
    }
}

// Tests module
#[cfg(test)]
mod tests;
