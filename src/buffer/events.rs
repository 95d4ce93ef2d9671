//! Change notifications emitted by a message buffer.

use crate::types::Message;
use serde::{Deserialize, Serialize};

/// What happened to a buffered message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The message was inserted at the tail.
    Added,
    /// The message was evicted to make room.
    Removed,
}

/// A single buffer state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub message: Message,
}

impl ChangeEvent {
    pub fn added(message: Message) -> Self {
        Self {
            kind: ChangeKind::Added,
            message,
        }
    }

    pub fn removed(message: Message) -> Self {
        Self {
            kind: ChangeKind::Removed,
            message,
        }
    }
}

/// Receives buffer changes after they have been committed.
///
/// Called on whichever thread happens to be draining the buffer's event
/// queue. Implementations may call back into the buffer.
pub trait BufferListener: Send + Sync {
    fn buffer_changed(&self, event: &ChangeEvent);
}

/// Delivery callback used by the transport layer, one call per message.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, message: Message);
}

/// Point-in-time buffer statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    /// Entries currently buffered.
    pub count: usize,
    /// Entries currently pinned.
    pub pinned: usize,
    /// Configured soft capacity.
    pub capacity: usize,
    /// Messages inserted since creation.
    pub total_inserted: u64,
    /// Messages evicted since creation (explicit removals not included).
    pub total_evicted: u64,
}
