//! Session handler contract for handler-driven collector runs.

use async_trait::async_trait;

use crate::error::BoxError;

/// Result type for session hooks.
pub type HookResult<T> = std::result::Result<T, BoxError>;

/// What a session proceeds with after handling a matched message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionVerdict {
    /// Close the session and mark the run as a success.
    Success,
    /// Close the session and mark the run as a failure.
    Fail,
    /// Keep listening for further messages.
    Continue,
}

/// Lifecycle hooks for a handler-driven collector run.
///
/// Supplied to [`MessageCollector::run_session`]: `on_start` runs before
/// the subscription is opened, `on_match` runs for every message the
/// predicate accepts and decides whether the session keeps going, and
/// `on_timeout` runs when the race timer expires. `on_cancel` is only
/// invoked when the caller abandons the run (drops its future), never by
/// the engine on a normal outcome.
///
/// Hooks may suspend; while one is in flight no further messages are
/// processed for that run. A hook error aborts the run and propagates to
/// the caller after the subscription and timer have been released.
///
/// Every hook except `on_match` has a default no-op body. [`NoopSession`]
/// is a full no-op implementation usable as a placeholder value.
///
/// [`MessageCollector::run_session`]: crate::MessageCollector::run_session
#[async_trait]
pub trait MessageSession<M: Send + Sync>: Send + Sync {
    /// Invoked once, before the run subscribes to the bus.
    async fn on_start(&self) -> HookResult<()> {
        Ok(())
    }

    /// Invoked for every message accepted by the predicate.
    async fn on_match(&self, message: &M) -> HookResult<SessionVerdict>;

    /// Invoked when the race timer expires, with the last message seen
    /// during the run, if any.
    async fn on_timeout(&self, last: Option<&M>) -> HookResult<()> {
        let _ = last;
        Ok(())
    }

    /// Invoked when the caller cancels the run mid-flight.
    async fn on_cancel(&self) -> HookResult<()> {
        Ok(())
    }
}

/// A session that does nothing: every hook is a no-op and every match
/// yields [`SessionVerdict::Continue`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSession;

#[async_trait]
impl<M: Send + Sync> MessageSession<M> for NoopSession {
    async fn on_match(&self, _message: &M) -> HookResult<SessionVerdict> {
        Ok(SessionVerdict::Continue)
    }
}
