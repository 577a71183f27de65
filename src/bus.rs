//! In-process message bus that collectors subscribe to.
//!
//! The bus is the push-based source side of the collector: callers publish
//! opaque message values, and every live [`Subscription`] receives each
//! message in publish order. Delivery into a subscription is a bounded
//! channel send, awaited to completion, so a slow consumer exerts implicit
//! backpressure on publishers once its buffer fills.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

/// Per-subscription channel capacity.
const SUBSCRIBER_BUFFER: usize = 256;

/// A push-based, in-process message bus.
///
/// Cloning the bus is cheap and yields another handle to the same
/// subscriber registry.
///
/// # Example
///
/// ```rust,ignore
/// let bus: MessageBus<serde_json::Value> = MessageBus::new();
/// let mut subscription = bus.subscribe();
///
/// bus.publish(json!({"kind": "tick"})).await;
///
/// while let Some(msg) = subscription.recv().await {
///     println!("Received: {msg}");
/// }
/// ```
pub struct MessageBus<M> {
    shared: Arc<BusShared<M>>,
}

struct BusShared<M> {
    /// Live subscriptions, keyed by token.
    subscribers: Mutex<HashMap<u64, mpsc::Sender<M>>>,
    /// Next subscription token.
    next_token: AtomicU64,
}

impl<M> BusShared<M> {
    fn subscribers(&self) -> MutexGuard<'_, HashMap<u64, mpsc::Sender<M>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, token: u64) -> bool {
        self.subscribers().remove(&token).is_some()
    }
}

impl<M> Clone for MessageBus<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M> Default for MessageBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> MessageBus<M> {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BusShared {
                subscribers: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscription and return its receiving half.
    ///
    /// The subscription unregisters itself when dropped, so every exit path
    /// of a consumer releases its slot on the bus.
    #[must_use]
    pub fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
        self.shared.subscribers().insert(token, tx);
        tracing::debug!(token, "bus subscription registered");

        Subscription {
            token,
            receiver: rx,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Remove a subscription by token.
    ///
    /// Returns `false` if the token is unknown (already unsubscribed).
    /// The subscription's receiver drains any buffered messages and then
    /// reports the stream as closed.
    pub fn unsubscribe(&self, token: u64) -> bool {
        let removed = self.shared.remove(token);
        if removed {
            tracing::debug!(token, "bus subscription removed");
        }
        removed
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers().len()
    }
}

impl<M: Clone> MessageBus<M> {
    /// Deliver a message to every live subscription, in turn.
    ///
    /// Each delivery awaits the subscriber's bounded channel, so publishing
    /// blocks once a consumer falls `SUBSCRIBER_BUFFER` messages behind.
    /// Subscriptions whose receiver has been closed are pruned.
    ///
    /// Returns the number of subscriptions the message was delivered to.
    pub async fn publish(&self, message: M) -> usize {
        let targets: Vec<(u64, mpsc::Sender<M>)> = self
            .shared
            .subscribers()
            .iter()
            .map(|(token, tx)| (*token, tx.clone()))
            .collect();

        let mut delivered = 0;
        for (token, tx) in targets {
            if tx.send(message.clone()).await.is_ok() {
                delivered += 1;
            } else {
                // Receiver closed without unregistering; drop the dead entry.
                self.shared.remove(token);
            }
        }

        tracing::trace!(delivered, "bus message published");
        delivered
    }
}

/// The receiving half of a bus subscription.
///
/// Messages arrive in publish order. Implements [`futures::Stream`] for use
/// with `StreamExt` combinators. Dropping the subscription unregisters it
/// from the bus.
pub struct Subscription<M> {
    token: u64,
    receiver: mpsc::Receiver<M>,
    shared: Weak<BusShared<M>>,
}

impl<M> Subscription<M> {
    /// The token identifying this subscription on the bus.
    #[must_use]
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the subscription is unsubscribed (after draining
    /// its buffer) or every handle to the bus has been dropped.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive the next message without waiting.
    pub fn try_recv(&mut self) -> Option<M> {
        self.receiver.try_recv().ok()
    }
}

impl<M> Stream for Subscription<M> {
    type Item = M;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.token);
            tracing::debug!(token = self.token, "bus subscription dropped");
        }
    }
}
