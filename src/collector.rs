//! The collector engine: race a bus subscription against a countdown.

use std::sync::Arc;
use std::time::Duration;

use crate::bus::MessageBus;
use crate::error::CollectorError;
use crate::options::{CollectOptions, MatchOptions, SessionOptions};
use crate::record::{MatchSequence, MessageMatch};
use crate::session::{MessageSession, SessionVerdict};
use crate::signal::{Completion, Resolution};
use crate::timer::RaceTimer;
use crate::Result;

/// Outcome of a single-match wait.
#[derive(Clone, Debug)]
pub struct WaitResult<M> {
    /// The last evaluated record, `None` if no message arrived before the
    /// wait ended. Check [`MessageMatch::succeeded`] to tell a match from
    /// an exhausted attempt cap.
    pub last_match: Option<MessageMatch<M>>,
    /// Whether the race timer expired before a resolution.
    pub timed_out: bool,
    /// Timer elapsed time at the end of the wait, measured from the most
    /// recent (re)start.
    pub elapsed: Duration,
}

/// Outcome of a bounded collection run.
#[derive(Clone, Debug)]
pub struct CollectResult<M> {
    /// Records accumulated so far, possibly short of capacity when the
    /// timer fired first.
    pub matches: MatchSequence<M>,
    /// Whether the race timer expired before capacity was reached.
    pub timed_out: bool,
    /// Timer elapsed time at the end of the run, measured from the most
    /// recent (re)start.
    pub elapsed: Duration,
}

/// Waits on a [`MessageBus`] for messages satisfying caller-supplied
/// predicates, racing an automatic timeout.
///
/// Each operation owns its own subscription, timer, and completion signal,
/// so concurrent operations against the same bus do not interfere. Inbound
/// messages for one operation are processed strictly in arrival order, one
/// at a time; while a predicate or session hook is running, no further
/// messages for that operation are evaluated.
///
/// # Example
///
/// ```rust,ignore
/// let bus: MessageBus<serde_json::Value> = MessageBus::new();
/// let collector = MessageCollector::new(&bus);
///
/// let result = collector
///     .next_match(|msg, _| msg["kind"] == "reply", MatchOptions::default())
///     .await?;
///
/// match result.last_match {
///     Some(m) if m.succeeded() => println!("Got it: {}", m.message()),
///     _ => println!("No reply (timed out: {})", result.timed_out),
/// }
/// ```
pub struct MessageCollector<M> {
    bus: MessageBus<M>,
}

impl<M> Clone for MessageCollector<M> {
    fn clone(&self) -> Self {
        Self {
            bus: self.bus.clone(),
        }
    }
}

impl<M: Clone + Send + Sync + 'static> MessageCollector<M> {
    /// Create a collector reading from the given bus.
    #[must_use]
    pub fn new(bus: &MessageBus<M>) -> Self {
        Self { bus: bus.clone() }
    }

    /// Wait for the next message satisfying `filter` (Mode A).
    ///
    /// Every inbound message is evaluated with its arrival index. The wait
    /// resolves on the first accepted message, when `max_attempts` messages
    /// have all been rejected, or when the timer expires, whichever comes
    /// first. Once resolved, no further messages are evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidOptions`] for a zero timeout or a
    /// zero attempt cap. Timeout and exhaustion are reported through
    /// [`WaitResult`], not as errors.
    pub async fn next_match<F>(&self, mut filter: F, options: MatchOptions) -> Result<WaitResult<M>>
    where
        F: FnMut(&M, usize) -> bool,
    {
        options.validate()?;

        let mut subscription = self.bus.subscribe();
        let timer = RaceTimer::new(options.timeout);
        let (completion, mut resolved) = Completion::channel();
        if options.timeout.is_some() {
            timer.start();
        }
        tracing::debug!(
            timeout = ?options.timeout,
            max_attempts = ?options.max_attempts,
            "single-match wait started"
        );

        let mut index = 0usize;
        let mut last_match: Option<MessageMatch<M>> = None;

        loop {
            tokio::select! {
                // Resolution first: once the signal is set, later deliveries
                // must not be evaluated. Expiry beats a buffered message.
                biased;

                _ = &mut resolved => break,
                () = timer.expired() => break,
                maybe = subscription.recv() => {
                    let Some(message) = maybe else { break };
                    let succeeded = filter(&message, index);
                    last_match = Some(MessageMatch::new(
                        index,
                        message,
                        succeeded,
                        timer.elapsed_time(),
                    ));

                    if succeeded {
                        completion.resolve(Resolution::Success);
                    } else if options.max_attempts == Some(index + 1) {
                        completion.resolve(Resolution::Failure);
                    }

                    if options.reset_timeout_on_attempt {
                        timer.reset();
                    }
                    index += 1;
                }
            }
        }

        let timed_out = timer.has_fired();
        timer.stop();
        let elapsed = timer.elapsed_time();
        tracing::debug!(attempts = index, timed_out, ?elapsed, "single-match wait finished");

        Ok(WaitResult {
            last_match,
            timed_out,
            elapsed,
        })
    }

    /// Collect messages satisfying `filter` until capacity or timeout
    /// (Mode B).
    ///
    /// The predicate sees the sequence gathered so far, so later matches
    /// can be conditioned on earlier ones. Every inbound message produces a
    /// record; it is appended when accepted, or also when rejected if
    /// `include_failed_matches` is set. The timeout window restarts only on
    /// accepted matches when `reset_timeout_on_match` is set.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidOptions`] for a zero timeout or a
    /// zero capacity.
    pub async fn collect<F>(&self, mut filter: F, options: CollectOptions) -> Result<CollectResult<M>>
    where
        F: FnMut(&M, &MatchSequence<M>, usize) -> bool,
    {
        options.validate()?;

        let mut subscription = self.bus.subscribe();
        let timer = RaceTimer::new(options.timeout);
        let (completion, mut resolved) = Completion::channel();
        if options.timeout.is_some() {
            timer.start();
        }
        tracing::debug!(
            timeout = ?options.timeout,
            capacity = ?options.capacity,
            "collection run started"
        );

        let mut index = 0usize;
        let mut matches = MatchSequence::new();

        loop {
            tokio::select! {
                biased;

                _ = &mut resolved => break,
                () = timer.expired() => break,
                maybe = subscription.recv() => {
                    let Some(message) = maybe else { break };
                    let succeeded = filter(&message, &matches, index);
                    let record = MessageMatch::new(
                        index,
                        message,
                        succeeded,
                        timer.elapsed_time(),
                    );

                    if succeeded {
                        matches.append(record);
                        if options.reset_timeout_on_match {
                            timer.reset();
                        }
                    } else if options.include_failed_matches {
                        matches.append(record);
                    }

                    if options.capacity == Some(matches.len()) {
                        timer.stop();
                        completion.resolve(Resolution::Success);
                    }
                    index += 1;
                }
            }
        }

        let timed_out = timer.has_fired();
        timer.stop();
        let elapsed = timer.elapsed_time();
        tracing::debug!(
            collected = matches.len(),
            timed_out,
            ?elapsed,
            "collection run finished"
        );

        Ok(CollectResult {
            matches,
            timed_out,
            elapsed,
        })
    }

    /// Run a handler-driven session (Mode C).
    ///
    /// `on_start` is awaited before the subscription is opened; its failure
    /// aborts the run. Each message accepted by `filter` is handed to the
    /// session's `on_match`, whose [`SessionVerdict`] decides whether the
    /// run closes (success or failure) or keeps listening. On expiry,
    /// `on_timeout` receives the last message seen, if any. `on_cancel`
    /// runs only when the caller drops this future mid-flight; the
    /// subscription and timer are released on that path as well.
    ///
    /// Returns the timer's elapsed time for the run.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::InvalidOptions`] for a zero timeout, and
    /// [`CollectorError::Session`] when a hook fails; hook errors surface
    /// only after the subscription has been released and the timer stopped.
    pub async fn run_session<F, S>(
        &self,
        filter: F,
        handler: S,
        options: SessionOptions,
    ) -> Result<Duration>
    where
        F: FnMut(&M, usize) -> bool,
        S: MessageSession<M> + 'static,
    {
        options.validate()?;

        let handler: Arc<dyn MessageSession<M>> = Arc::new(handler);
        let mut cancel_guard = CancelGuard {
            handler: Some(Arc::clone(&handler)),
        };
        let result = self.drive_session(filter, handler, options).await;
        cancel_guard.disarm();
        result
    }

    async fn drive_session<F>(
        &self,
        mut filter: F,
        handler: Arc<dyn MessageSession<M>>,
        options: SessionOptions,
    ) -> Result<Duration>
    where
        F: FnMut(&M, usize) -> bool,
    {
        handler.on_start().await.map_err(CollectorError::Session)?;

        let mut subscription = self.bus.subscribe();
        let timer = RaceTimer::new(options.timeout);
        let (completion, mut resolved) = Completion::channel();
        if options.timeout.is_some() {
            timer.start();
        }
        tracing::debug!(timeout = ?options.timeout, "session started");

        let mut index = 0usize;
        let mut last: Option<M> = None;

        loop {
            tokio::select! {
                biased;

                _ = &mut resolved => break,
                () = timer.expired() => break,
                maybe = subscription.recv() => {
                    let Some(message) = maybe else { break };
                    if filter(&message, index) {
                        // While the hook is suspended no further messages
                        // are processed; an expiry during the hook is
                        // observed on the next loop turn.
                        match handler.on_match(&message).await {
                            Ok(SessionVerdict::Success) => {
                                completion.resolve(Resolution::Success);
                            }
                            Ok(SessionVerdict::Fail) => {
                                completion.resolve(Resolution::Failure);
                            }
                            Ok(SessionVerdict::Continue) => {}
                            Err(error) => {
                                timer.stop();
                                return Err(CollectorError::Session(error));
                            }
                        }
                    }
                    last = Some(message);
                    if options.reset_timeout_on_attempt {
                        timer.reset();
                    }
                    index += 1;
                }
            }
        }

        let timed_out = timer.has_fired();
        timer.stop();
        let elapsed = timer.elapsed_time();

        // Release the subscription before handing control back to the
        // handler.
        drop(subscription);

        if timed_out {
            handler
                .on_timeout(last.as_ref())
                .await
                .map_err(CollectorError::Session)?;
        }

        tracing::debug!(attempts = index, timed_out, ?elapsed, "session finished");
        Ok(elapsed)
    }
}

/// Spawns the session's `on_cancel` hook if the run is abandoned before it
/// completes. Disarmed on every normal return, including hook errors.
struct CancelGuard<M: Send + Sync + 'static> {
    handler: Option<Arc<dyn MessageSession<M>>>,
}

impl<M: Send + Sync + 'static> CancelGuard<M> {
    fn disarm(&mut self) {
        self.handler = None;
    }
}

impl<M: Send + Sync + 'static> Drop for CancelGuard<M> {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(async move {
                    if let Err(error) = handler.on_cancel().await {
                        tracing::warn!(%error, "session on_cancel hook failed");
                    }
                });
            }
        }
    }
}
