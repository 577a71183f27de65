//! Error types for the message collector.

use thiserror::Error;

/// Boxed error type returned by caller-supplied session hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Collector errors.
///
/// Timeouts and exhaustion (max attempts, capacity) are normal terminal
/// outcomes and are reported through the mode-specific return values, not
/// through this type.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Invalid operation configuration, rejected before subscribing.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// A session hook returned an error.
    ///
    /// The subscription has already been released and the timer stopped by
    /// the time this is surfaced.
    #[error("Session hook failed: {0}")]
    Session(#[source] BoxError),
}
