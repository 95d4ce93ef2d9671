//! Live subscriptions to broker destinations.
//!
//! A [`Subscription`] owns one [`MessageBuffer`](crate::buffer::MessageBuffer)
//! and feeds it from the transport layer's delivery callback. Every buffer
//! change is forwarded to registered observers together with the
//! subscription itself, so one observer can watch many subscriptions.
//!
//! Observers run on whichever thread drained the buffer. A UI that wants
//! updates on its own thread can register a [`ChannelObserver`] and poll the
//! returned [`ObserverHandle`].
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::from_preferences(&prefs);
//! let subscription = manager.subscribe(Destination::queue("orders"))?;
//!
//! let (observer, handle) = ChannelObserver::bounded(1000);
//! subscription.add_observer(observer)?;
//!
//! // Transport thread
//! subscription.on_message_delivered(message);
//!
//! // UI thread
//! while let Ok(update) = handle.try_recv() {
//!     match update.event {
//!         SubscriptionEvent::Changed(change) => refresh_row(change),
//!         SubscriptionEvent::Domain(event) => show_status(event),
//!     }
//! }
//! ```

mod manager;
mod subscription;
mod types;

pub use manager::SubscriptionManager;
pub use subscription::Subscription;
pub use types::{
    ChannelObserver, DomainEvent, ObserverHandle, ObserverId, SubscriptionEvent, SubscriptionId,
    SubscriptionObserver, SubscriptionUpdate,
};
