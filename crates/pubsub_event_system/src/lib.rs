//! # PubSub Event System
//!
//! An in-process, synchronous publish/subscribe dispatcher. Callers subscribe
//! to named events with a target and a priority; [`Manager::publish`] later
//! invokes the matching subscribers in priority order, handing each one a
//! mutable [`Event`] it can inspect, change, or use to stop further delivery.
//!
//! ## Core Features
//!
//! - **Priority ordering**: higher priority runs first, ties run in subscribe order
//! - **Lazy subscribers**: a [`Factory`] builds the real subscriber the first time
//!   it is needed and is never run again for that subscription
//! - **Only-once subscriptions**: removed automatically after their first delivery
//! - **Propagation stop**: any subscriber can end the current pass early
//! - **Reentrancy**: subscribers receive the [`Manager`] and may subscribe,
//!   unsubscribe or publish while a pass is running
//! - **Bulk registration**: objects implementing [`SubscriberInterface`] declare
//!   all their subscriptions at once, and can be removed again exactly
//!
//! ## Quick Start
//!
//! ```rust
//! use pubsub_event_system::{Manager, Target};
//! use serde_json::json;
//!
//! let manager = Manager::new();
//!
//! manager.subscribe("order.placed", Target::callback(|event, _name, _manager| {
//!     event.set_value("validated", true);
//!     Ok(())
//! }), 10, false)?;
//!
//! manager.subscribe("order.placed", Target::callback(|event, _name, _manager| {
//!     if event.value("validated") != Some(&json!(true)) {
//!         event.stop_propagation();
//!     }
//!     Ok(())
//! }), 0, false)?;
//!
//! let event = manager.publish("order.placed")?;
//! assert!(!event.is_propagation_stopped());
//! # Ok::<(), pubsub_event_system::EventError>(())
//! ```
//!
//! ## Threading
//!
//! Everything runs on the caller's stack and the manager is
//! `!Send`: there is no locking, no background work and no parallel dispatch.

pub mod capability;
pub mod error;
pub mod event;
pub mod shutdown;
pub mod system;
pub mod target;

pub use capability::{SubscriberInterface, SubscriptionInfo, SubscriptionMap, SubscriptionSpec};
pub use error::EventError;
pub use event::{Event, EventValues};
pub use shutdown::EVENT_SHUTDOWN;
pub use system::{DispatchStats, Manager};
pub use target::{callback, Callback, Factory, Invocable, Subscriber, Target};

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: i32 = 0;

/// Crate version, for hosts that log what they embed.
pub const PUBSUB_EVENT_SYSTEM_VERSION: &str = env!("CARGO_PKG_VERSION");
