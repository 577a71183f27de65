//! Restartable countdown timer that races the completion signal.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};

/// A restartable, cancellable countdown with elapsed-time accounting.
///
/// The timer holds at most one active countdown. On natural expiry it fires
/// exactly once, stops itself, and wakes anyone awaiting [`expired`]; it
/// never re-fires without an intervening [`start`]. A timer configured with
/// no duration never fires but still tracks wall time from `start()`.
///
/// All methods take `&self`: state lives behind a mutex and restarts are
/// signalled to the awaiting observer through a watch channel, so `start`,
/// `stop`, and `reset` can be called from a `select!` branch while
/// `expired()` is pending in another.
///
/// [`expired`]: RaceTimer::expired
/// [`start`]: RaceTimer::start
pub(crate) struct RaceTimer {
    duration: Option<Duration>,
    state: Mutex<TimerState>,
    epochs: watch::Sender<u64>,
}

#[derive(Default)]
struct TimerState {
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
    running: bool,
    fired: bool,
    /// Bumped on every start/stop so a pending sleep can tell its countdown
    /// was superseded.
    epoch: u64,
}

impl RaceTimer {
    /// Create a stopped timer. A `None` duration means "never fires".
    pub(crate) fn new(duration: Option<Duration>) -> Self {
        let (epochs, _) = watch::channel(0);
        Self {
            duration,
            state: Mutex::new(TimerState::default()),
            epochs,
        }
    }

    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self, epoch: u64) {
        self.epochs.send_replace(epoch);
    }

    /// Begin counting from now. No-op if already running.
    pub(crate) fn start(&self) {
        let epoch = {
            let mut state = self.state();
            if state.running {
                return;
            }
            state.started_at = Some(Instant::now());
            state.stopped_at = None;
            state.running = true;
            state.fired = false;
            state.epoch += 1;
            state.epoch
        };
        self.bump(epoch);
    }

    /// Halt the countdown and capture the stop timestamp. No-op if not
    /// running. Clears the fired flag, distinguishing "externally stopped"
    /// from "expired".
    pub(crate) fn stop(&self) {
        let epoch = {
            let mut state = self.state();
            if !state.running {
                return;
            }
            state.stopped_at = Some(Instant::now());
            state.running = false;
            state.fired = false;
            state.epoch += 1;
            state.epoch
        };
        self.bump(epoch);
    }

    /// Restart the countdown window, but only if it is currently running.
    /// A dormant timer stays dormant.
    pub(crate) fn reset(&self) {
        if self.is_running() {
            self.stop();
            self.start();
        }
    }

    /// Whether the countdown is currently active.
    pub(crate) fn is_running(&self) -> bool {
        self.state().running
    }

    /// Whether the timer reached natural expiry.
    pub(crate) fn has_fired(&self) -> bool {
        self.state().fired
    }

    /// Elapsed time: zero if never started, `now - start` while running,
    /// `stop - start` once stopped or fired.
    pub(crate) fn elapsed_time(&self) -> Duration {
        let state = self.state();
        match state.started_at {
            None => Duration::ZERO,
            Some(started_at) => match state.stopped_at {
                Some(stopped_at) => stopped_at.duration_since(started_at),
                None => started_at.elapsed(),
            },
        }
    }

    /// Wait for natural expiry.
    ///
    /// Resolves immediately if the timer has already fired. Tracks restarts:
    /// a `reset()` while this is pending re-arms the full duration window.
    /// Never resolves for a stopped timer or one configured without a
    /// duration.
    pub(crate) async fn expired(&self) {
        let mut epochs = self.epochs.subscribe();
        loop {
            // Mark the current epoch as seen before sampling state, so any
            // concurrent restart is picked up by `changed()` below.
            epochs.borrow_and_update();

            let (deadline, epoch) = {
                let state = self.state();
                if state.fired {
                    return;
                }
                let deadline = match (state.running, state.started_at, self.duration) {
                    (true, Some(started_at), Some(duration)) => Some(started_at + duration),
                    _ => None,
                };
                (deadline, state.epoch)
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        () = time::sleep_until(deadline) => {
                            if self.fire(epoch) {
                                return;
                            }
                        }
                        changed = epochs.changed() => {
                            // The sender lives in `self`, so this only fails
                            // if the timer itself is gone.
                            if changed.is_err() {
                                return;
                            }
                        }
                    }
                }
                None => {
                    if epochs.changed().await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Transition to fired, unless the countdown was restarted or stopped
    /// while the expiry sleep was pending.
    fn fire(&self, epoch: u64) -> bool {
        let mut state = self.state();
        if !state.running || state.fired || state.epoch != epoch {
            return false;
        }
        state.running = false;
        state.fired = true;
        state.stopped_at = Some(Instant::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn never_started_reports_zero_elapsed() {
        let timer = RaceTimer::new(Some(TICK));
        assert_eq!(timer.elapsed_time(), Duration::ZERO);
        assert!(!timer.is_running());
        assert!(!timer.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_duration() {
        let timer = RaceTimer::new(Some(TICK));
        timer.start();
        timer.expired().await;

        assert!(timer.has_fired());
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_time(), TICK);

        // Already fired: resolves again without re-arming.
        timer.expired().await;
        assert_eq!(timer.elapsed_time(), TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restarts_the_countdown_window() {
        let timer = RaceTimer::new(Some(TICK));
        timer.start();

        time::advance(Duration::from_millis(60)).await;
        timer.reset();
        time::advance(Duration::from_millis(60)).await;

        // 120ms since the original start, 60ms since the reset.
        assert!(!timer.has_fired());

        timer.expired().await;
        assert_eq!(timer.elapsed_time(), TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_expiry_is_pending_rearms_the_sleep() {
        let timer = RaceTimer::new(Some(TICK));
        timer.start();

        let expiry = timer.expired();
        tokio::pin!(expiry);

        time::advance(Duration::from_millis(60)).await;
        assert!(futures::poll!(expiry.as_mut()).is_pending());

        timer.reset();
        time::advance(Duration::from_millis(60)).await;
        assert!(futures::poll!(expiry.as_mut()).is_pending());

        time::advance(Duration::from_millis(40)).await;
        expiry.await;
        assert!(timer.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_firing_and_freezes_elapsed() {
        let timer = RaceTimer::new(Some(TICK));
        timer.start();
        time::advance(Duration::from_millis(50)).await;
        timer.stop();

        tokio::select! {
            () = timer.expired() => panic!("stopped timer must not fire"),
            () = time::sleep(TICK * 3) => {}
        }

        assert!(!timer.has_fired());
        assert_eq!(timer.elapsed_time(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_on_dormant_timer_is_a_noop() {
        let timer = RaceTimer::new(Some(TICK));
        timer.reset();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_time(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_running_is_a_noop() {
        let timer = RaceTimer::new(Some(TICK));
        timer.start();
        time::advance(Duration::from_millis(60)).await;
        timer.start();

        // The original window still applies: 40ms left, not 100ms.
        timer.expired().await;
        assert_eq!(timer.elapsed_time(), TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn absent_duration_never_fires_but_tracks_time() {
        let timer = RaceTimer::new(None);
        timer.start();

        tokio::select! {
            () = timer.expired() => panic!("timer without a duration must not fire"),
            () = time::sleep(Duration::from_secs(3600)) => {}
        }

        assert_eq!(timer.elapsed_time(), Duration::from_secs(3600));
    }
}
