/// Statistics tracking for the manager
use serde::{Deserialize, Serialize};

/// Dispatch counters for monitoring a [`Manager`](super::Manager).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    /// Number of `publish` calls, including ones with no subscribers
    pub events_published: u64,
    /// Number of successful subscriber invocations
    pub deliveries: u64,
    /// Number of lazy factories materialized into stored subscriptions
    pub factories_resolved: u64,
    /// Number of passes that ended early because propagation was stopped
    pub propagation_stops: u64,
    /// Number of subscriptions registered when the snapshot was taken
    pub total_subscriptions: usize,
}
