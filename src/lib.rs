//! Message Collector
//!
//! This crate lets a caller wait, without blocking the event loop, for one
//! or more messages from a push-based bus to satisfy a predicate, with an
//! automatic timeout, optional reset-on-activity semantics, and optional
//! bounded collection of many matches.
//!
//! # Building blocks
//!
//! - [`MessageBus`] - in-process push source; publish on one side,
//!   [`Subscription`] streams on the other
//! - [`MessageCollector`] - the race engine layered over a bus
//! - [`MessageSession`] - lifecycle hooks for handler-driven runs
//!
//! Every collector operation races a subscription against a restartable
//! countdown and produces exactly one terminal outcome: a match, an
//! exhausted attempt cap, a filled capacity, or a timeout. The subscription
//! is released on every exit path, including predicate panics and hook
//! errors.
//!
//! # Example: wait for a single message
//!
//! ```rust,ignore
//! use message_collector::{MatchOptions, MessageBus, MessageCollector};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = MessageBus::new();
//!     let collector = MessageCollector::new(&bus);
//!
//!     let result = collector
//!         .next_match(|msg, _| msg["kind"] == "reply", MatchOptions::default())
//!         .await?;
//!
//!     if let Some(reply) = result.last_match.filter(|m| m.succeeded()) {
//!         println!("Replied after {:?}: {}", reply.elapsed(), reply.message());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Example: collect a bounded batch
//!
//! ```rust,ignore
//! use message_collector::{CollectOptions, MessageCollector};
//!
//! let result = collector
//!     .collect(
//!         |msg, matches, _| {
//!             // No duplicate senders across the batch.
//!             matches.iter().all(|m| m.message()["sender"] != msg["sender"])
//!         },
//!         CollectOptions {
//!             capacity: Some(3),
//!             ..CollectOptions::default()
//!         },
//!     )
//!     .await?;
//!
//! println!("Collected {} votes", result.matches.len());
//! ```
//!
//! # Example: handler-driven session
//!
//! ```rust,ignore
//! use message_collector::{MessageSession, SessionOptions, SessionVerdict};
//!
//! struct Quiz;
//!
//! #[async_trait::async_trait]
//! impl MessageSession<serde_json::Value> for Quiz {
//!     async fn on_match(&self, msg: &serde_json::Value) -> message_collector::HookResult<SessionVerdict> {
//!         Ok(if msg["answer"] == 42 {
//!             SessionVerdict::Success
//!         } else {
//!             SessionVerdict::Continue
//!         })
//!     }
//! }
//!
//! let elapsed = collector
//!     .run_session(|msg, _| msg["kind"] == "answer", Quiz, SessionOptions::default())
//!     .await?;
//! ```

mod bus;
mod collector;
mod error;
mod options;
pub mod prelude;
mod record;
mod session;
mod signal;
mod timer;

pub use bus::{MessageBus, Subscription};
pub use collector::{CollectResult, MessageCollector, WaitResult};
pub use error::{BoxError, CollectorError};
pub use options::{CollectOptions, MatchOptions, SessionOptions};
pub use record::{MatchSequence, MessageMatch};
pub use session::{HookResult, MessageSession, NoopSession, SessionVerdict};

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CollectorError>;
