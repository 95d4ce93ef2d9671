//! A live subscription: one destination feeding one buffer.

use super::types::{
    DomainEvent, ObserverId, SubscriptionEvent, SubscriptionId, SubscriptionObserver,
};
use crate::buffer::{BufferListener, BufferStats, ChangeEvent, MessageBuffer, MessageListener};
use crate::config::SubscriptionConfig;
use crate::error::{BufferError, Result};
use crate::types::{Destination, Message};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Forwards buffer changes to the owning subscription's observers.
///
/// Holds the subscription weakly so the buffer never keeps it alive.
struct ObserverForwarder {
    subscription: Weak<Subscription>,
}

impl BufferListener for ObserverForwarder {
    fn buffer_changed(&self, event: &ChangeEvent) {
        if let Some(subscription) = self.subscription.upgrade() {
            subscription.notify(&SubscriptionEvent::Changed(event.clone()));
        }
    }
}

/// Binds one destination's delivery stream to an exclusively owned
/// [`MessageBuffer`] and fans its changes out to observers.
pub struct Subscription {
    id: SubscriptionId,
    destination: Destination,
    buffer: MessageBuffer,
    observers: RwLock<Vec<(ObserverId, Arc<dyn SubscriptionObserver>)>>,
    next_observer_id: AtomicU64,
    closed: AtomicBool,
}

impl Subscription {
    /// Create a subscription with a fresh buffer sized from `config`.
    pub fn new(
        id: SubscriptionId,
        destination: Destination,
        config: &SubscriptionConfig,
    ) -> Result<Arc<Self>> {
        let buffer = MessageBuffer::with_capacity(config.max_buffered_messages)?;
        Ok(Self::with_buffer(id, destination, buffer))
    }

    /// Create a subscription that takes ownership of `buffer`.
    pub fn with_buffer(
        id: SubscriptionId,
        destination: Destination,
        buffer: MessageBuffer,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            buffer.add_listener(Arc::new(ObserverForwarder {
                subscription: weak.clone(),
            }));
            Self {
                id,
                destination,
                buffer,
                observers: RwLock::new(Vec::new()),
                next_observer_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }
        })
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    // --- Delivery ---

    /// Entry point for the transport layer's delivery callback.
    ///
    /// Deliveries racing with [`close`](Self::close) are dropped by the
    /// buffer, which checks its closed flag under its own lock.
    pub fn on_message_delivered(&self, message: Message) {
        self.buffer.insert(message);
    }

    /// Forward a connection-layer event to all observers.
    pub fn process_event(&self, event: DomainEvent) {
        self.notify(&SubscriptionEvent::Domain(event));
    }

    // --- Buffer pass-throughs ---

    pub fn message_count(&self) -> usize {
        self.buffer.count()
    }

    /// Buffered messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.buffer.snapshot()
    }

    /// Pin a message so eviction skips it.
    pub fn lock_message(&self, message: &Message) {
        self.buffer.pin(message);
    }

    pub fn unlock_message(&self, message: &Message) {
        self.buffer.unpin(message);
    }

    pub fn unlock_all_messages(&self) {
        self.buffer.unpin_all();
    }

    pub fn is_locked(&self, message: &Message) -> bool {
        self.buffer.is_pinned(message)
    }

    /// Remove messages regardless of pinning. Observers are not notified.
    pub fn remove_messages<'a, I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a Message>,
    {
        self.buffer.remove(messages)
    }

    pub fn max_buffered_messages(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn set_max_buffered_messages(&self, max: usize) -> Result<()> {
        self.buffer.set_capacity(max)
    }

    pub fn stats(&self) -> BufferStats {
        self.buffer.stats()
    }

    // --- Observers ---

    /// Register an observer. Registering the same observer twice returns the
    /// existing id.
    pub fn add_observer(&self, observer: Arc<dyn SubscriptionObserver>) -> Result<ObserverId> {
        let target = Arc::as_ptr(&observer) as *const ();
        let mut observers = self.observers.write();
        // Checked under the observer lock, which close() also holds.
        if self.is_closed() {
            return Err(BufferError::SubscriptionClosed(self.id));
        }
        if let Some((id, _)) = observers
            .iter()
            .find(|(_, o)| Arc::as_ptr(o) as *const () == target)
        {
            return Ok(*id);
        }

        let id = ObserverId(self.next_observer_id.fetch_add(1, Ordering::SeqCst));
        observers.push((id, observer));
        tracing::debug!(subscription = %self.id, observer = id.0, "observer registered");
        Ok(id)
    }

    /// Unregister an observer. Returns false if it was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    fn notify(&self, event: &SubscriptionEvent) {
        // Copy so observers can (un)register from inside a callback.
        let observers: Vec<Arc<dyn SubscriptionObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer.update(self, event);
        }
    }

    // --- Lifecycle ---

    /// Drop all observers and buffered messages, and ignore later deliveries.
    pub fn close(&self) {
        let mut observers = self.observers.write();
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        observers.clear();
        let discarded = self.buffer.close();
        drop(observers);
        tracing::debug!(
            subscription = %self.id,
            destination = %self.destination,
            discarded,
            "subscription closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MessageListener for Subscription {
    fn on_message(&self, message: Message) {
        self.on_message_delivered(message);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("destination", &self.destination)
            .field("buffer", &self.buffer)
            .field("observers", &self.observer_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
