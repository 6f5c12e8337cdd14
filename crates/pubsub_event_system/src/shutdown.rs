//! Reserved shutdown event.
//!
//! The manager does not hook into process teardown itself. A host application
//! decides when the process is going away (signal, end of `main`, ...) and calls
//! [`Manager::publish_shutdown`], which publishes [`EVENT_SHUTDOWN`] at most once.

use crate::error::EventError;
use crate::event::Event;
use crate::system::Manager;
use tracing::{debug, info};

/// Event name published once when the hosting process shuts down.
pub const EVENT_SHUTDOWN: &str = "process.shutdown";

impl Manager {
    /// Publishes [`EVENT_SHUTDOWN`] the first time it is called.
    ///
    /// Returns `Ok(None)` on every later call. A failing subscriber still counts
    /// as the one shutdown publish.
    pub fn publish_shutdown(&self) -> Result<Option<Event>, EventError> {
        if self.shutdown_published.replace(true) {
            debug!("Shutdown event already published; ignoring");
            return Ok(None);
        }
        info!("🛑 Publishing {}", EVENT_SHUTDOWN);
        self.publish(EVENT_SHUTDOWN).map(Some)
    }

    /// Returns true once the shutdown event has been published.
    pub fn is_shutdown_published(&self) -> bool {
        self.shutdown_published.get()
    }
}
