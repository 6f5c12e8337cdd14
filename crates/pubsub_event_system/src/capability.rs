//! # Bulk Subscription Interfaces
//!
//! An object implementing [`SubscriberInterface`] declares all of its
//! subscriptions in one place. [`Manager::add_subscriber_interface`](crate::Manager::add_subscriber_interface)
//! reads the declaration, normalizes it and subscribes every entry;
//! [`Manager::remove_subscriber_interface`](crate::Manager::remove_subscriber_interface)
//! re-reads it and undoes exactly that.
//!
//! ## Declaration shapes
//!
//! The declaration is a map from event name to one of:
//!
//! - a method name: `"onSave"` (priority 0, not only-once);
//! - a callback;
//! - one tuple mixing, in any order, a method name or callback, a `bool`
//!   (only-once) and an `i32` (priority): `("onSave", 10)`, `(true, "onSave")`;
//! - a list of the above for several subscriptions to the same event:
//!   `vec![("onSave",).into(), ("onSaveLate", -5).into()]`.
//!
//! Tuple values are told apart by type alone, so each slot may be filled once.
//! Declarations can also be written as JSON:
//!
//! ```rust
//! use pubsub_event_system::{Event, EventError, Manager, Subscriber, SubscriberInterface, SubscriptionSpec};
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! struct Mailer;
//!
//! impl Subscriber for Mailer {
//!     fn call(&self, _method: &str, _event: &mut Event, _name: &str, _manager: &Manager) -> Result<(), EventError> {
//!         Ok(())
//!     }
//! }
//!
//! impl SubscriberInterface for Mailer {
//!     fn subscriptions(&self) -> SubscriptionSpec {
//!         json!({
//!             "user.created": "sendWelcome",
//!             "user.deleted": [["sendGoodbye", 10], ["purgeQueue", true]],
//!         })
//!         .into()
//!     }
//! }
//!
//! let manager = Manager::new();
//! let added = manager.add_subscriber_interface(&Rc::new(Mailer))?;
//! assert_eq!(added["user.deleted"].len(), 2);
//! # Ok::<(), EventError>(())
//! ```

use crate::error::EventError;
use crate::target::{Callback, Invocable, Subscriber};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Capability implemented by objects that declare their own subscriptions.
pub trait SubscriberInterface: Subscriber {
    /// Returns the declaration; anything but [`SubscriptionSpec::Map`] is rejected.
    fn subscriptions(&self) -> SubscriptionSpec;
}

/// A declarative subscription value, before normalization.
#[derive(Clone)]
pub enum SubscriptionSpec {
    /// Event name to specification
    Map(IndexMap<String, SubscriptionSpec>),
    /// A tuple, or a list of specifications
    List(Vec<SubscriptionSpec>),
    /// Method name bound on the declaring object
    Method(String),
    /// A callback used as-is
    Callback(Callback),
    /// Only-once flag
    OnlyOnce(bool),
    /// Priority
    Priority(i32),
    /// A value that has no meaning in a declaration (e.g. JSON `null`)
    Unsupported(String),
}

impl SubscriptionSpec {
    /// Builds a [`SubscriptionSpec::Map`] from `(event name, spec)` pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SubscriptionSpec>,
    {
        SubscriptionSpec::Map(
            entries
                .into_iter()
                .map(|(event_name, spec)| (event_name.into(), spec.into()))
                .collect(),
        )
    }

    /// Short description of the value's shape, used in error messages.
    pub fn kind(&self) -> &str {
        match self {
            SubscriptionSpec::Map(_) => "map",
            SubscriptionSpec::List(_) => "list",
            SubscriptionSpec::Method(_) => "string",
            SubscriptionSpec::Callback(_) => "callback",
            SubscriptionSpec::OnlyOnce(_) => "bool",
            SubscriptionSpec::Priority(_) => "integer",
            SubscriptionSpec::Unsupported(kind) => kind.as_str(),
        }
    }
}

impl fmt::Debug for SubscriptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionSpec::Map(map) => f.debug_map().entries(map.iter()).finish(),
            SubscriptionSpec::List(list) => f.debug_list().entries(list.iter()).finish(),
            SubscriptionSpec::Method(method) => write!(f, "{:?}", method),
            SubscriptionSpec::Callback(cb) => write!(f, "Callback({:p})", Rc::as_ptr(cb)),
            SubscriptionSpec::OnlyOnce(flag) => write!(f, "{}", flag),
            SubscriptionSpec::Priority(priority) => write!(f, "{}", priority),
            SubscriptionSpec::Unsupported(kind) => write!(f, "<{}>", kind),
        }
    }
}

impl From<&str> for SubscriptionSpec {
    fn from(method: &str) -> Self {
        SubscriptionSpec::Method(method.to_string())
    }
}

impl From<String> for SubscriptionSpec {
    fn from(method: String) -> Self {
        SubscriptionSpec::Method(method)
    }
}

impl From<bool> for SubscriptionSpec {
    fn from(only_once: bool) -> Self {
        SubscriptionSpec::OnlyOnce(only_once)
    }
}

impl From<i32> for SubscriptionSpec {
    fn from(priority: i32) -> Self {
        SubscriptionSpec::Priority(priority)
    }
}

impl From<Callback> for SubscriptionSpec {
    fn from(callback: Callback) -> Self {
        SubscriptionSpec::Callback(callback)
    }
}

impl<T: Into<SubscriptionSpec>> From<Vec<T>> for SubscriptionSpec {
    fn from(items: Vec<T>) -> Self {
        SubscriptionSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SubscriptionSpec>, const N: usize> From<[T; N]> for SubscriptionSpec {
    fn from(items: [T; N]) -> Self {
        SubscriptionSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<SubscriptionSpec>> From<(A,)> for SubscriptionSpec {
    fn from((a,): (A,)) -> Self {
        SubscriptionSpec::List(vec![a.into()])
    }
}

impl<A, B> From<(A, B)> for SubscriptionSpec
where
    A: Into<SubscriptionSpec>,
    B: Into<SubscriptionSpec>,
{
    fn from((a, b): (A, B)) -> Self {
        SubscriptionSpec::List(vec![a.into(), b.into()])
    }
}

impl<A, B, C> From<(A, B, C)> for SubscriptionSpec
where
    A: Into<SubscriptionSpec>,
    B: Into<SubscriptionSpec>,
    C: Into<SubscriptionSpec>,
{
    fn from((a, b, c): (A, B, C)) -> Self {
        SubscriptionSpec::List(vec![a.into(), b.into(), c.into()])
    }
}

impl From<Value> for SubscriptionSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => SubscriptionSpec::Map(
                map.into_iter()
                    .map(|(event_name, spec)| (event_name, spec.into()))
                    .collect(),
            ),
            Value::Array(items) => {
                SubscriptionSpec::List(items.into_iter().map(Into::into).collect())
            }
            Value::String(method) => SubscriptionSpec::Method(method),
            Value::Bool(flag) => SubscriptionSpec::OnlyOnce(flag),
            Value::Number(number) => match number.as_i64().map(i32::try_from) {
                Some(Ok(priority)) => SubscriptionSpec::Priority(priority),
                _ => SubscriptionSpec::Unsupported(format!("number {}", number)),
            },
            Value::Null => SubscriptionSpec::Unsupported("null".to_string()),
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// One normalized subscription: what `subscribe` is called with.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionInfo {
    /// Callback, or method bound on the declaring object
    pub target: Invocable,
    /// Dispatch priority
    pub priority: i32,
    /// Remove after the first successful invocation
    pub only_once: bool,
}

/// Normalized declaration: event name to its subscriptions, in declaration order.
pub type SubscriptionMap = IndexMap<String, Vec<SubscriptionInfo>>;

/// Reads and normalizes `interface`'s declaration.
///
/// Pure apart from calling [`SubscriberInterface::subscriptions`]: nothing is
/// subscribed here, and the same declaration always yields the same map.
pub fn normalize<S: SubscriberInterface>(interface: &Rc<S>) -> Result<SubscriptionMap, EventError> {
    let object: Rc<dyn Subscriber> = interface.clone();
    let interface_name = interface.subscriber_name();

    let declared = match interface.subscriptions() {
        SubscriptionSpec::Map(declared) => declared,
        other => {
            return Err(EventError::Configuration(format!(
                "Expected map from {}::subscriptions(), got {}",
                interface_name,
                other.kind()
            )))
        }
    };

    declared
        .iter()
        .map(|(event_name, spec)| {
            normalize_event(&object, spec)
                .map(|infos| (event_name.clone(), infos))
                .ok_or_else(|| {
                    EventError::Configuration(format!(
                        "{}::subscriptions(): unexpected subscriber(s) defined for {}",
                        interface_name, event_name
                    ))
                })
        })
        .collect()
}

/// A single subscription first; failing that, a list of single subscriptions.
fn normalize_event(object: &Rc<dyn Subscriber>, spec: &SubscriptionSpec) -> Option<Vec<SubscriptionInfo>> {
    if let Some(info) = normalize_single(object, spec) {
        return Some(vec![info]);
    }
    match spec {
        SubscriptionSpec::List(items) => items
            .iter()
            .map(|item| normalize_single(object, item))
            .collect(),
        _ => None,
    }
}

fn normalize_single(object: &Rc<dyn Subscriber>, spec: &SubscriptionSpec) -> Option<SubscriptionInfo> {
    match spec {
        SubscriptionSpec::Method(_) | SubscriptionSpec::Callback(_) => Some(SubscriptionInfo {
            target: bind(object, spec)?,
            priority: crate::DEFAULT_PRIORITY,
            only_once: false,
        }),
        SubscriptionSpec::List(values) => normalize_tuple(object, values),
        _ => None,
    }
}

/// Assigns each tuple value to the one slot its type fits. Fails if a value
/// fits no free slot or no target is given.
fn normalize_tuple(object: &Rc<dyn Subscriber>, values: &[SubscriptionSpec]) -> Option<SubscriptionInfo> {
    let mut target = None;
    let mut only_once = None;
    let mut priority = None;

    for value in values {
        match value {
            SubscriptionSpec::Method(_) | SubscriptionSpec::Callback(_) if target.is_none() => {
                target = bind(object, value);
            }
            SubscriptionSpec::OnlyOnce(flag) if only_once.is_none() => only_once = Some(*flag),
            SubscriptionSpec::Priority(p) if priority.is_none() => priority = Some(*p),
            _ => return None,
        }
    }

    Some(SubscriptionInfo {
        target: target?,
        priority: priority.unwrap_or(crate::DEFAULT_PRIORITY),
        only_once: only_once.unwrap_or(false),
    })
}

fn bind(object: &Rc<dyn Subscriber>, spec: &SubscriptionSpec) -> Option<Invocable> {
    match spec {
        SubscriptionSpec::Method(method) => Some(Invocable::bound(object.clone(), method.clone())),
        SubscriptionSpec::Callback(callback) => Some(Invocable::Callback(callback.clone())),
        _ => None,
    }
}
