//! Subscription identifiers, events and observers.

use super::subscription::Subscription;
use crate::buffer::ChangeEvent;
use crate::types::Destination;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one observer registration on a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Connection-level events forwarded from the broker layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BrokerConnected,
    BrokerDisconnected,
    /// An asynchronous consumer reported an error.
    AsyncError { message: String },
}

/// Events delivered to subscription observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// A message was added to or evicted from the buffer.
    Changed(ChangeEvent),
    /// The connection layer reported something about the destination.
    Domain(DomainEvent),
}

impl SubscriptionEvent {
    /// The buffer change, if this is one.
    pub fn change(&self) -> Option<&ChangeEvent> {
        match self {
            SubscriptionEvent::Changed(change) => Some(change),
            SubscriptionEvent::Domain(_) => None,
        }
    }
}

/// Receives one callback per subscription event.
///
/// The subscription is passed along so an observer registered on several
/// subscriptions can tell which one changed. Callbacks arrive on the thread
/// that drained the buffer, not necessarily the thread that registered.
///
/// `update` may run on several threads at once: domain events are delivered
/// on the caller of [`Subscription::process_event`] while change events are
/// delivered by whichever thread is draining the buffer. It may also be
/// re-entered if the observer mutates the subscription from inside the
/// callback. Implementations must tolerate concurrent and re-entrant calls.
pub trait SubscriptionObserver: Send + Sync {
    fn update(&self, subscription: &Subscription, event: &SubscriptionEvent);
}

/// An event tagged with its source, for consumption on another thread.
#[derive(Clone, Debug)]
pub struct SubscriptionUpdate {
    pub subscription: SubscriptionId,
    pub destination: Destination,
    pub event: SubscriptionEvent,
}

/// Observer that forwards events into a channel.
///
/// A bounded channel that fills up marks the observer as overflowed and
/// stops forwarding, so a stalled consumer never blocks delivery.
pub struct ChannelObserver {
    sender: Sender<SubscriptionUpdate>,
    overflowed: Arc<AtomicBool>,
}

impl ChannelObserver {
    /// Observer backed by a channel holding at most `capacity` updates.
    pub fn bounded(capacity: usize) -> (Arc<Self>, ObserverHandle) {
        Self::from_channel(bounded(capacity))
    }

    /// Observer backed by an unbounded channel.
    pub fn unbounded() -> (Arc<Self>, ObserverHandle) {
        Self::from_channel(unbounded())
    }

    fn from_channel(
        (sender, receiver): (Sender<SubscriptionUpdate>, Receiver<SubscriptionUpdate>),
    ) -> (Arc<Self>, ObserverHandle) {
        let overflowed = Arc::new(AtomicBool::new(false));
        let observer = Arc::new(Self {
            sender,
            overflowed: Arc::clone(&overflowed),
        });
        (
            observer,
            ObserverHandle {
                receiver,
                overflowed,
            },
        )
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }
}

impl SubscriptionObserver for ChannelObserver {
    fn update(&self, subscription: &Subscription, event: &SubscriptionEvent) {
        if self.is_overflowed() {
            return;
        }

        let update = SubscriptionUpdate {
            subscription: subscription.id(),
            destination: subscription.destination().clone(),
            event: event.clone(),
        };

        match self.sender.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.overflowed.store(true, Ordering::Release);
                tracing::warn!(
                    subscription = %subscription.id(),
                    destination = %subscription.destination(),
                    "observer channel full, dropping further updates"
                );
            }
            // Receiver gone; nothing left to do.
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Receiving end of a [`ChannelObserver`].
pub struct ObserverHandle {
    /// Channel to receive updates.
    pub receiver: Receiver<SubscriptionUpdate>,
    overflowed: Arc<AtomicBool>,
}

impl ObserverHandle {
    /// Receive the next update (blocking).
    pub fn recv(&self) -> Result<SubscriptionUpdate, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an update (non-blocking).
    pub fn try_recv(&self) -> Result<SubscriptionUpdate, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<SubscriptionUpdate, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything currently queued.
    pub fn drain(&self) -> Vec<SubscriptionUpdate> {
        self.receiver.try_iter().collect()
    }

    /// Whether the observer stopped forwarding because the channel filled up.
    pub fn is_overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }
}
