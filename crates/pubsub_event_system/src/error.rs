//! Error types for the publish/subscribe dispatcher

/// Errors raised by the manager and by subscriber code during dispatch.
///
/// Every variant is raised synchronously at the call that detects it. The
/// manager never retries or swallows an error: a failing subscriber aborts the
/// remainder of the dispatch pass and the error is returned from `publish`.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Subscribe was given something that is neither invocable nor a well-formed factory
    #[error("Expected callable or closure factory, but {0} provided")]
    InvalidTarget(String),

    /// A bulk subscription declaration could not be normalized
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A bound subscriber was asked to run a method it does not implement
    #[error("{subscriber} does not implement subscriber method '{method}'")]
    UnknownMethod {
        /// Type name of the subscriber object
        subscriber: String,
        /// The method name that was requested
        method: String,
    },

    /// Subscriber code failed while handling an event
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
}

impl EventError {
    /// Builds an [`EventError::UnknownMethod`] for the given subscriber type.
    pub fn unknown_method(subscriber: impl Into<String>, method: impl Into<String>) -> Self {
        EventError::UnknownMethod {
            subscriber: subscriber.into(),
            method: method.into(),
        }
    }
}
