//! Per-mode configuration for collector operations.

use std::time::Duration;

use crate::error::CollectorError;
use crate::Result;

fn validate_timeout(timeout: Option<Duration>) -> Result<()> {
    if timeout == Some(Duration::ZERO) {
        return Err(CollectorError::InvalidOptions(
            "timeout must be non-zero".to_string(),
        ));
    }
    Ok(())
}

/// Configuration for [`MessageCollector::next_match`].
///
/// [`MessageCollector::next_match`]: crate::MessageCollector::next_match
#[derive(Clone, Debug)]
pub struct MatchOptions {
    /// Time allowed to pass before the wait resolves as timed out.
    /// `None` waits indefinitely. Default: 10 seconds.
    pub timeout: Option<Duration>,
    /// Maximum number of evaluated messages before the wait resolves as a
    /// failure. Default: no cap.
    pub max_attempts: Option<usize>,
    /// Restart the timeout window after every evaluated message.
    /// Default: `false`.
    pub reset_timeout_on_attempt: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(10)),
            max_attempts: None,
            reset_timeout_on_attempt: false,
        }
    }
}

impl MatchOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        validate_timeout(self.timeout)?;
        if self.max_attempts == Some(0) {
            return Err(CollectorError::InvalidOptions(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for [`MessageCollector::collect`].
///
/// [`MessageCollector::collect`]: crate::MessageCollector::collect
#[derive(Clone, Debug)]
pub struct CollectOptions {
    /// Time allowed to pass before collection stops with whatever has been
    /// gathered. `None` collects indefinitely. Default: 30 seconds.
    pub timeout: Option<Duration>,
    /// Number of collected records at which the run resolves successfully.
    /// Default: no cap.
    pub capacity: Option<usize>,
    /// Also append records for messages the predicate rejected.
    /// Default: `false`.
    pub include_failed_matches: bool,
    /// Restart the timeout window on every successful match. Failed but
    /// included records do not restart it. Default: `false`.
    pub reset_timeout_on_match: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            capacity: None,
            include_failed_matches: false,
            reset_timeout_on_match: false,
        }
    }
}

impl CollectOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        validate_timeout(self.timeout)?;
        if self.capacity == Some(0) {
            return Err(CollectorError::InvalidOptions(
                "capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for [`MessageCollector::run_session`].
///
/// [`MessageCollector::run_session`]: crate::MessageCollector::run_session
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Time allowed to pass before the session times out. `None` runs
    /// until the handler closes it. Default: 10 seconds.
    pub timeout: Option<Duration>,
    /// Restart the timeout window after every evaluated message.
    /// Default: `true` — sessions usually measure idle time between
    /// messages rather than total runtime.
    pub reset_timeout_on_attempt: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(10)),
            reset_timeout_on_attempt: true,
        }
    }
}

impl SessionOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        validate_timeout(self.timeout)
    }
}
