//! One-shot completion signal ending the race between matches and timeout.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

/// Terminal verdict carried by a resolved [`Completion`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// The operation matched, filled its capacity, or was told to succeed.
    Success,
    /// Attempts were exhausted or a session handler signalled failure.
    Failure,
}

/// Single-assignment completion signal.
///
/// The first [`resolve`] wins and wakes the receiving half; every later
/// call is a safe no-op rather than an error, so a timer fire and a match
/// landing "simultaneously" cannot double-terminate an operation.
///
/// [`resolve`]: Completion::resolve
pub(crate) struct Completion {
    sender: Mutex<Option<oneshot::Sender<Resolution>>>,
}

impl Completion {
    /// Create a completion signal and its single-read receiving half.
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Resolution>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Resolve the signal. Returns `true` if this call was the first.
    pub(crate) fn resolve(&self, resolution: Resolution) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => {
                // A dropped receiver still counts as resolved; nobody is
                // left to observe the verdict.
                let _ = tx.send(resolution);
                true
            }
            None => false,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_resolution_wins() {
        let (completion, rx) = Completion::channel();

        assert!(completion.resolve(Resolution::Success));

        // Second resolution is a no-op, not an error.
        assert!(!completion.resolve(Resolution::Failure));

        assert_eq!(rx.await.unwrap(), Resolution::Success);
    }

    #[tokio::test]
    async fn resolving_after_receiver_dropped_is_safe() {
        let (completion, rx) = Completion::channel();
        drop(rx);

        assert!(completion.resolve(Resolution::Failure));
        assert!(!completion.resolve(Resolution::Failure));
    }
}
