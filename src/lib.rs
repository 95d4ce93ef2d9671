//! # Live Buffer
//!
//! Bounded, thread-safe buffers for messages arriving on a broker
//! subscription, with per-message pinning.
//!
//! ## Core Concepts
//!
//! - **Buffer**: Ordered messages with a soft capacity; inserts evict the
//!   oldest unpinned entries
//! - **Pinning**: Pinned messages are never evicted, only removed explicitly
//! - **Subscription**: One destination's delivery stream feeding one buffer
//! - **Observers**: One callback per insert or eviction, after it committed
//!
//! ## Example
//!
//! ```ignore
//! use livebuffer::{Destination, Message, MessageId, SubscriptionManager};
//!
//! let manager = SubscriptionManager::new();
//! let subscription = manager.subscribe(Destination::queue("orders"))?;
//! subscription.set_max_buffered_messages(3)?;
//!
//! let keep = Message::new(MessageId(1), "important");
//! subscription.on_message_delivered(keep.clone());
//! subscription.lock_message(&keep);
//!
//! for id in 2..10 {
//!     subscription.on_message_delivered(Message::new(MessageId(id), "noise"));
//! }
//! assert!(subscription.messages().contains(&keep));
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use buffer::{
    BufferListener, BufferStats, ChangeEvent, ChangeKind, MessageBuffer, MessageListener,
};
pub use config::{
    InMemoryPreferences, Preferences, SubscriptionConfig, DEFAULT_MAX_BUFFERED_MESSAGES,
    PREF_MAX_BUFFERED_MSG,
};
pub use error::{BufferError, Result};
pub use subscriptions::{
    ChannelObserver, DomainEvent, ObserverHandle, ObserverId, Subscription, SubscriptionEvent,
    SubscriptionId, SubscriptionManager, SubscriptionObserver, SubscriptionUpdate,
};
pub use types::*;
