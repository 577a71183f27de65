//! Convenient re-exports for common usage.
//!
//! ```rust,ignore
//! use message_collector::prelude::*;
//!
//! let bus = MessageBus::new();
//! let collector = MessageCollector::new(&bus);
//!
//! let result = collector
//!     .next_match(|msg, _| msg["kind"] == "reply", MatchOptions::default())
//!     .await?;
//! ```

pub use crate::bus::{MessageBus, Subscription};
pub use crate::collector::{CollectResult, MessageCollector, WaitResult};
pub use crate::error::{BoxError, CollectorError};
pub use crate::options::{CollectOptions, MatchOptions, SessionOptions};
pub use crate::record::{MatchSequence, MessageMatch};
pub use crate::session::{HookResult, MessageSession, NoopSession, SessionVerdict};
pub use crate::Result;

// Re-export StreamExt for convenient subscription stream operations.
pub use futures::StreamExt;
