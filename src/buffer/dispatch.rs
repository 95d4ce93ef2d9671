//! Ordered, post-commit delivery of buffer changes to listeners.
//!
//! Mutations enqueue their events while still holding the buffer lock, so the
//! queue order is the mutation order. After the lock is released, the
//! mutating thread tries to become the single drainer. If another thread (or
//! an outer frame on the same thread) is already draining, the events are
//! left for it, which keeps delivery FIFO and makes re-entrant mutations from
//! inside a listener safe.

use super::events::{BufferListener, ChangeEvent};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct Dispatcher {
    listeners: RwLock<Vec<Arc<dyn BufferListener>>>,
    pending: Mutex<VecDeque<ChangeEvent>>,
    draining: AtomicBool,
}

/// Releases the drainer role even if a listener panics.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn BufferListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn remove_listener(&self, listener: &Arc<dyn BufferListener>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| Arc::as_ptr(l) as *const () != target);
        listeners.len() != before
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Queue an event. Must be called while the buffer lock is held.
    pub(crate) fn enqueue(&self, event: ChangeEvent) {
        if self.listeners.read().is_empty() {
            return;
        }
        self.pending.lock().push_back(event);
    }

    /// Deliver queued events unless someone else already is.
    ///
    /// Must be called without the buffer lock held.
    pub(crate) fn drain(&self) {
        loop {
            if self
                .draining
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }

            {
                let _guard = DrainGuard(&self.draining);
                loop {
                    // Separate statement: the queue lock must not be held
                    // while listeners run.
                    let next = self.pending.lock().pop_front();
                    match next {
                        Some(event) => self.deliver(&event),
                        None => break,
                    }
                }
            }

            // An event may have been queued between the last pop and the
            // guard releasing the flag; its producer saw us draining.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    fn deliver(&self, event: &ChangeEvent) {
        let listeners: Vec<Arc<dyn BufferListener>> = self.listeners.read().clone();
        for listener in listeners {
            listener.buffer_changed(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, MessageId};

    struct Recorder(Mutex<Vec<MessageId>>);

    impl BufferListener for Recorder {
        fn buffer_changed(&self, event: &ChangeEvent) {
            self.0.lock().push(event.message.id());
        }
    }

    #[test]
    fn test_drain_in_fifo_order() {
        let dispatcher = Dispatcher::new();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        dispatcher.add_listener(recorder.clone());

        for i in 1..=3 {
            dispatcher.enqueue(ChangeEvent::added(Message::empty(MessageId(i))));
        }
        dispatcher.drain();

        assert_eq!(
            *recorder.0.lock(),
            vec![MessageId(1), MessageId(2), MessageId(3)]
        );
    }

    #[test]
    fn test_no_listeners_drops_events() {
        let dispatcher = Dispatcher::new();
        dispatcher.enqueue(ChangeEvent::added(Message::empty(MessageId(1))));
        assert!(dispatcher.pending.lock().is_empty());
    }

    #[test]
    fn test_remove_listener() {
        let dispatcher = Dispatcher::new();
        let recorder: Arc<dyn BufferListener> = Arc::new(Recorder(Mutex::new(Vec::new())));
        dispatcher.add_listener(recorder.clone());
        assert_eq!(dispatcher.listener_count(), 1);

        assert!(dispatcher.remove_listener(&recorder));
        assert!(!dispatcher.remove_listener(&recorder));
        assert_eq!(dispatcher.listener_count(), 0);
    }
}
