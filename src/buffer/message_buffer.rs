//! Bounded, pin-aware message buffer.

use super::dispatch::Dispatcher;
use super::events::{BufferListener, BufferStats, ChangeEvent, MessageListener};
use crate::config::DEFAULT_MAX_BUFFERED_MESSAGES;
use crate::error::{BufferError, Result};
use crate::types::{Message, MessageId, Sequence};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A buffered message and its pin flag.
struct BufferEntry {
    message: Message,
    pinned: bool,
    sequence: Sequence,
}

/// Everything guarded by the buffer lock.
struct BufferState {
    capacity: usize,
    /// Oldest first; sequences strictly increase front to back.
    entries: VecDeque<BufferEntry>,
    next_sequence: Sequence,
    total_inserted: u64,
    total_evicted: u64,
    /// Set by `close`; inserts are dropped from then on.
    closed: bool,
}

impl BufferState {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
            next_sequence: Sequence(1),
            total_inserted: 0,
            total_evicted: 0,
            closed: false,
        }
    }

    /// Evict oldest unpinned entries until at capacity or only pinned remain.
    ///
    /// The tail entry is the one just inserted and is never a victim, so a
    /// new arrival behind a fully pinned buffer is kept over capacity.
    fn evict_overflow(&mut self) -> Vec<Message> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            let older = self.entries.len() - 1;
            let index = match self.entries.iter().take(older).position(|e| !e.pinned) {
                Some(index) => index,
                None => break,
            };
            if let Some(entry) = self.entries.remove(index) {
                tracing::debug!(
                    message = %entry.message.id(),
                    sequence = ?entry.sequence,
                    capacity = self.capacity,
                    "evicted message"
                );
                evicted.push(entry.message);
            }
        }
        self.total_evicted += evicted.len() as u64;
        evicted
    }

    fn set_pinned(&mut self, id: MessageId, pinned: bool) {
        for entry in self.entries.iter_mut().filter(|e| e.message.id() == id) {
            entry.pinned = pinned;
        }
    }
}

/// Ordered buffer of delivered messages with a soft capacity.
///
/// Inserting beyond capacity evicts the oldest unpinned entries. Pinned
/// entries are never evicted, so the buffer may grow past capacity when
/// everything in it is pinned.
///
/// Only [`insert`](Self::insert) produces change events: one
/// [`ChangeKind::Added`](super::ChangeKind::Added) followed by one
/// [`ChangeKind::Removed`](super::ChangeKind::Removed) per eviction. Pinning,
/// unpinning, explicit removal and capacity changes are silent.
///
/// # Thread Safety
///
/// All operations take a single internal lock. Listeners run after the lock
/// is released, in mutation order, and may call back into the buffer.
pub struct MessageBuffer {
    state: Mutex<BufferState>,
    dispatcher: Dispatcher,
}

impl MessageBuffer {
    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState::new(DEFAULT_MAX_BUFFERED_MESSAGES)),
            dispatcher: Dispatcher::new(),
        }
    }

    /// Create a buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let buffer = Self::new();
        buffer.set_capacity(capacity)?;
        Ok(buffer)
    }

    /// Change the capacity. Takes effect on the next insert; nothing is
    /// evicted here.
    pub fn set_capacity(&self, capacity: usize) -> Result<()> {
        if capacity < 1 {
            return Err(BufferError::InvalidCapacity(capacity));
        }
        let mut state = self.state.lock();
        tracing::debug!(old = state.capacity, new = capacity, "buffer capacity changed");
        state.capacity = capacity;
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Register a listener for change events.
    pub fn add_listener(&self, listener: Arc<dyn BufferListener>) {
        self.dispatcher.add_listener(listener);
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn BufferListener>) -> bool {
        self.dispatcher.remove_listener(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.dispatcher.listener_count()
    }

    // --- Mutations ---

    /// Append a message and run the eviction pass.
    ///
    /// Ignored once the buffer has been closed.
    pub fn insert(&self, message: Message) {
        {
            let mut state = self.state.lock();
            if state.closed {
                tracing::trace!(message = %message.id(), "ignoring insert into closed buffer");
                return;
            }
            let sequence = state.next_sequence;
            state.next_sequence = sequence.next();
            state.total_inserted += 1;

            tracing::trace!(message = %message.id(), sequence = ?sequence, "buffered message");
            self.dispatcher.enqueue(ChangeEvent::added(message.clone()));
            state.entries.push_back(BufferEntry {
                message,
                pinned: false,
                sequence,
            });

            for evicted in state.evict_overflow() {
                self.dispatcher.enqueue(ChangeEvent::removed(evicted));
            }
        }

        self.dispatcher.drain();
    }

    /// Exempt a buffered message from eviction. No-op if it is not buffered.
    pub fn pin(&self, message: &Message) {
        self.state.lock().set_pinned(message.id(), true);
    }

    /// Make a buffered message evictable again. No-op if it is not buffered.
    ///
    /// The entry stays until a later insert's eviction pass reaches it.
    pub fn unpin(&self, message: &Message) {
        self.state.lock().set_pinned(message.id(), false);
    }

    /// Make every buffered message evictable.
    pub fn unpin_all(&self) {
        for entry in self.state.lock().entries.iter_mut() {
            entry.pinned = false;
        }
    }

    /// Remove the given messages whether pinned or not.
    ///
    /// Returns the number of entries removed. Emits no change events.
    pub fn remove<'a, I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let ids: HashSet<MessageId> = messages.into_iter().map(Message::id).collect();
        if ids.is_empty() {
            return 0;
        }

        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| !ids.contains(&e.message.id()));
        before - state.entries.len()
    }

    /// Remove everything, pinned or not. Emits no change events.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    /// Discard everything and refuse later inserts. Emits no change events.
    ///
    /// Returns the number of entries discarded. Closing twice is a no-op.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    // --- Queries ---

    pub fn count(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn contains(&self, message: &Message) -> bool {
        let id = message.id();
        self.state.lock().entries.iter().any(|e| e.message.id() == id)
    }

    pub fn is_pinned(&self, message: &Message) -> bool {
        let id = message.id();
        self.state
            .lock()
            .entries
            .iter()
            .any(|e| e.pinned && e.message.id() == id)
    }

    pub fn pinned_count(&self) -> usize {
        self.state.lock().entries.iter().filter(|e| e.pinned).count()
    }

    /// Buffered messages, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn stats(&self) -> BufferStats {
        let state = self.state.lock();
        BufferStats {
            count: state.entries.len(),
            pinned: state.entries.iter().filter(|e| e.pinned).count(),
            capacity: state.capacity,
            total_inserted: state.total_inserted,
            total_evicted: state.total_evicted,
        }
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageListener for MessageBuffer {
    fn on_message(&self, message: Message) {
        self.insert(message);
    }
}

impl fmt::Debug for MessageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.stats();
        f.debug_struct("MessageBuffer")
            .field("count", &stats.count)
            .field("pinned", &stats.pinned)
            .field("capacity", &stats.capacity)
            .finish()
    }
}
