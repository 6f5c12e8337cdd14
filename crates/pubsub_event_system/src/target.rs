//! # Subscription Targets
//!
//! A subscription points either at something that can be called right away
//! ([`Invocable`]) or at a [`Factory`] that builds the real subscriber the first
//! time the event's subscriber list is needed. Both shapes are wrapped in the
//! [`Target`] tagged union handed to [`Manager::subscribe`].
//!
//! ## Matching
//!
//! Removal compares resolved targets with [`Invocable`]'s `PartialEq`:
//! - two bound methods match when they point at the *same object allocation*
//!   and carry the same method name;
//! - two callbacks match when they are the *same* shared closure.
//!
//! A factory that builds a brand-new closure on every call therefore never
//! matches an earlier resolution of itself, while a factory handing out a shared
//! object or closure does.

use crate::error::EventError;
use crate::event::Event;
use crate::system::Manager;
use std::fmt;
use std::rc::Rc;

/// Shared subscriber closure: receives the event, the event name and the manager.
pub type Callback = Rc<dyn Fn(&mut Event, &str, &Manager) -> Result<(), EventError>>;

/// Wraps a closure into a shareable [`Callback`].
///
/// Keep a clone of the returned value around if you want to unsubscribe it later.
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&mut Event, &str, &Manager) -> Result<(), EventError> + 'static,
{
    Rc::new(f)
}

/// An object whose methods can be bound to events by name.
///
/// This is the Rust shape of an `[object, "method"]` pair: the manager keeps the
/// object and the method name together and calls [`Subscriber::call`] with the
/// name on every delivery.
///
/// ```rust
/// use pubsub_event_system::{Event, EventError, Manager, Subscriber};
/// use std::cell::Cell;
///
/// #[derive(Default)]
/// struct Audit {
///     seen: Cell<u32>,
/// }
///
/// impl Subscriber for Audit {
///     fn call(&self, method: &str, _event: &mut Event, _name: &str, _manager: &Manager) -> Result<(), EventError> {
///         match method {
///             "record" => {
///                 self.seen.set(self.seen.get() + 1);
///                 Ok(())
///             }
///             other => Err(EventError::unknown_method(self.subscriber_name(), other)),
///         }
///     }
///
///     fn responds_to(&self, method: &str) -> bool {
///         method == "record"
///     }
/// }
/// ```
pub trait Subscriber: 'static {
    /// Runs `method` for the delivered event.
    fn call(
        &self,
        method: &str,
        event: &mut Event,
        event_name: &str,
        manager: &Manager,
    ) -> Result<(), EventError>;

    /// Whether `method` can be dispatched. Used to reject bad bindings at subscribe time.
    fn responds_to(&self, method: &str) -> bool {
        let _ = method;
        true
    }

    /// Name used in logs and error messages.
    fn subscriber_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// Invocable
// ============================================================================

/// A target that can be called immediately.
#[derive(Clone)]
pub enum Invocable {
    /// A plain closure
    Callback(Callback),
    /// A method bound to a subscriber object
    Method {
        /// The object the method is dispatched on
        object: Rc<dyn Subscriber>,
        /// The method name passed to [`Subscriber::call`]
        method: String,
    },
}

impl Invocable {
    /// Wraps a closure.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&mut Event, &str, &Manager) -> Result<(), EventError> + 'static,
    {
        Invocable::Callback(callback(f))
    }

    /// Binds `method` on a concrete subscriber object.
    pub fn method<S: Subscriber>(object: Rc<S>, method: impl Into<String>) -> Self {
        Invocable::Method {
            object,
            method: method.into(),
        }
    }

    /// Binds `method` on an already type-erased subscriber object.
    pub fn bound(object: Rc<dyn Subscriber>, method: impl Into<String>) -> Self {
        Invocable::Method {
            object,
            method: method.into(),
        }
    }

    /// The bound object, for method targets.
    pub fn object(&self) -> Option<&Rc<dyn Subscriber>> {
        match self {
            Invocable::Method { object, .. } => Some(object),
            Invocable::Callback(_) => None,
        }
    }

    /// The bound method name, for method targets.
    pub fn method_name(&self) -> Option<&str> {
        match self {
            Invocable::Method { method, .. } => Some(method),
            Invocable::Callback(_) => None,
        }
    }

    /// Returns true when `object` is the very allocation this target is bound to.
    pub fn is_bound_to<S: Subscriber>(&self, object: &Rc<S>) -> bool {
        self.object()
            .is_some_and(|bound| std::ptr::addr_eq(Rc::as_ptr(bound), Rc::as_ptr(object)))
    }

    pub(crate) fn invoke(
        &self,
        event: &mut Event,
        event_name: &str,
        manager: &Manager,
    ) -> Result<(), EventError> {
        match self {
            Invocable::Callback(f) => f(event, event_name, manager),
            Invocable::Method { object, method } => object.call(method, event, event_name, manager),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), EventError> {
        match self {
            Invocable::Callback(_) => Ok(()),
            Invocable::Method { object, method } => {
                check_method_name(method)?;
                if object.responds_to(method) {
                    Ok(())
                } else {
                    Err(EventError::InvalidTarget(format!(
                        "[{}, \"{}\"] (no such subscriber method)",
                        object.subscriber_name(),
                        method
                    )))
                }
            }
        }
    }
}

impl PartialEq for Invocable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Invocable::Callback(a), Invocable::Callback(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (
                Invocable::Method { object: a, method: m1 },
                Invocable::Method { object: b, method: m2 },
            ) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)) && m1 == m2,
            _ => false,
        }
    }
}

impl fmt::Debug for Invocable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocable::Callback(cb) => write!(f, "Callback({:p})", Rc::as_ptr(cb)),
            Invocable::Method { object, method } => {
                write!(f, "[{}, \"{}\"]", object.subscriber_name(), method)
            }
        }
    }
}

// ============================================================================
// Lazy factories
// ============================================================================

type CallableProducer = Rc<dyn Fn(&Manager) -> Callback>;
type ObjectProducer = Rc<dyn Fn(&Manager) -> Rc<dyn Subscriber>>;

/// Deferred subscriber: a producer run at most once per subscription entry.
///
/// The producer receives the manager so the subscriber it builds can keep a
/// handle for re-publishing later.
#[derive(Clone)]
pub enum Factory {
    /// Producer yields a callable closure
    Callable(CallableProducer),
    /// Producer yields an object; `method` is bound on it
    Method {
        /// Builds the subscriber object
        producer: ObjectProducer,
        /// Method bound on the produced object
        method: String,
    },
}

impl Factory {
    /// Factory whose producer returns a ready [`Callback`].
    pub fn callable<P>(producer: P) -> Self
    where
        P: Fn(&Manager) -> Callback + 'static,
    {
        Factory::Callable(Rc::new(producer))
    }

    /// Factory whose producer returns an object that `method` is bound on.
    pub fn method<P, S>(producer: P, method: impl Into<String>) -> Self
    where
        P: Fn(&Manager) -> Rc<S> + 'static,
        S: Subscriber,
    {
        let producer: ObjectProducer = Rc::new(move |manager: &Manager| -> Rc<dyn Subscriber> {
            producer(manager)
        });
        Factory::Method {
            producer,
            method: method.into(),
        }
    }

    /// Runs the producer and returns the materialized target.
    pub(crate) fn produce(&self, manager: &Manager) -> Invocable {
        match self {
            Factory::Callable(producer) => Invocable::Callback(producer(manager)),
            Factory::Method { producer, method } => Invocable::Method {
                object: producer(manager),
                method: method.clone(),
            },
        }
    }

    fn validate(&self) -> Result<(), EventError> {
        match self {
            Factory::Callable(_) => Ok(()),
            Factory::Method { method, .. } => check_method_name(method),
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Callable(p) => write!(f, "[Factory({:p})]", Rc::as_ptr(p)),
            Factory::Method { producer, method } => {
                write!(f, "[Factory({:p}), \"{}\"]", Rc::as_ptr(producer), method)
            }
        }
    }
}

// ============================================================================
// Target
// ============================================================================

/// What a subscription calls: a direct invocable or a lazy factory.
///
/// Once a factory entry has been resolved the manager replaces it with the
/// resulting [`Target::Direct`] for the rest of the entry's life.
#[derive(Clone, Debug)]
pub enum Target {
    /// Ready to call
    Direct(Invocable),
    /// Materialized on first use
    Factory(Factory),
}

impl Target {
    /// Shorthand for a direct closure target.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&mut Event, &str, &Manager) -> Result<(), EventError> + 'static,
    {
        Target::Direct(Invocable::callback(f))
    }

    /// Shorthand for a direct bound-method target.
    pub fn method<S: Subscriber>(object: Rc<S>, method: impl Into<String>) -> Self {
        Target::Direct(Invocable::method(object, method))
    }

    /// Returns true while the target still needs resolving.
    pub fn is_factory(&self) -> bool {
        matches!(self, Target::Factory(_))
    }

    /// Returns the direct invocable, when already resolved.
    pub fn as_invocable(&self) -> Option<&Invocable> {
        match self {
            Target::Direct(invocable) => Some(invocable),
            Target::Factory(_) => None,
        }
    }

    /// Checks the target's shape without running any factory.
    pub(crate) fn validate(&self) -> Result<(), EventError> {
        match self {
            Target::Direct(invocable) => invocable.validate(),
            Target::Factory(factory) => factory.validate(),
        }
    }

    /// Resolves into a comparison value; factories are run but nothing is memoized.
    pub(crate) fn materialize(self, manager: &Manager) -> Invocable {
        match self {
            Target::Direct(invocable) => invocable,
            Target::Factory(factory) => factory.produce(manager),
        }
    }
}

impl From<Invocable> for Target {
    fn from(invocable: Invocable) -> Self {
        Target::Direct(invocable)
    }
}

impl From<Factory> for Target {
    fn from(factory: Factory) -> Self {
        Target::Factory(factory)
    }
}

impl From<Callback> for Target {
    fn from(callback: Callback) -> Self {
        Target::Direct(Invocable::Callback(callback))
    }
}

/// Method names must look like identifiers.
fn check_method_name(method: &str) -> Result<(), EventError> {
    let mut chars = method.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EventError::InvalidTarget(format!(
            "method name \"{}\"",
            method.escape_debug()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Probe;

    impl Subscriber for Probe {
        fn call(&self, _: &str, _: &mut Event, _: &str, _: &Manager) -> Result<(), EventError> {
            Ok(())
        }

        fn responds_to(&self, method: &str) -> bool {
            method == "onFoo"
        }
    }

    #[test]
    fn test_bound_methods_match_by_object_identity_and_name() {
        let a = Rc::new(Probe);
        let b = Rc::new(Probe);

        assert_eq!(Invocable::method(a.clone(), "onFoo"), Invocable::method(a.clone(), "onFoo"));
        assert_ne!(Invocable::method(a.clone(), "onFoo"), Invocable::method(a.clone(), "onBar"));
        assert_ne!(Invocable::method(a.clone(), "onFoo"), Invocable::method(b, "onFoo"));

        let erased: Rc<dyn Subscriber> = a.clone();
        assert_eq!(Invocable::bound(erased, "onFoo"), Invocable::method(a, "onFoo"));
    }

    #[test]
    fn test_callbacks_match_by_identity_only() {
        let shared = callback(|_, _, _| Ok(()));
        let same_body = callback(|_, _, _| Ok(()));

        assert_eq!(Invocable::Callback(shared.clone()), Invocable::Callback(shared.clone()));
        assert_ne!(Invocable::Callback(shared), Invocable::Callback(same_body));
    }

    #[test]
    fn test_callback_never_matches_method() {
        let cb = Invocable::callback(|_, _, _| Ok(()));
        assert_ne!(cb, Invocable::method(Rc::new(Probe), "onFoo"));
    }

    #[test]
    fn test_validate_rejects_malformed_method_names() {
        for bad in ["", "1abc", "on foo", "on-foo"] {
            let target = Target::method(Rc::new(Probe), bad);
            assert!(matches!(target.validate(), Err(EventError::InvalidTarget(_))), "{bad:?}");
        }
    }

    #[test]
    fn test_validate_rejects_method_object_cannot_run() {
        let target = Target::method(Rc::new(Probe), "onBar");
        let err = target.validate().unwrap_err();
        assert!(err.to_string().contains("onBar"));
        assert!(Target::method(Rc::new(Probe), "onFoo").validate().is_ok());
    }

    #[test]
    fn test_validate_never_runs_factories() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let target: Target = Factory::method(
            move |_| {
                counter.set(counter.get() + 1);
                Rc::new(Probe)
            },
            "onBar",
        )
        .into();

        assert!(target.is_factory());
        assert!(target.validate().is_ok());
        assert!(target.as_invocable().is_none());
        assert_eq!(calls.get(), 0);

        assert!(matches!(
            Target::from(Factory::method(|_| Rc::new(Probe), "")).validate(),
            Err(EventError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_debug_formats() {
        let rendered = format!("{:?}", Invocable::method(Rc::new(Probe), "onFoo"));
        assert!(rendered.ends_with("Probe, \"onFoo\"]"));
        assert!(format!("{:?}", Invocable::callback(|_, _, _| Ok(()))).starts_with("Callback("));
    }
}
