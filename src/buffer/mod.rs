//! Bounded message buffering with pinning.
//!
//! A [`MessageBuffer`] keeps delivered messages in arrival order up to a soft
//! capacity. When an insert pushes it over capacity, the oldest unpinned
//! entries are evicted. Pinned entries are only ever removed explicitly.
//!
//! # Example
//!
//! ```ignore
//! let buffer = MessageBuffer::with_capacity(3)?;
//! buffer.insert(a.clone());
//! buffer.pin(&a);
//! buffer.insert(b);
//! buffer.insert(c);
//! buffer.insert(d); // evicts b, a is pinned
//! ```

mod dispatch;
mod events;
mod message_buffer;

pub use events::{BufferListener, BufferStats, ChangeEvent, ChangeKind, MessageListener};
pub use message_buffer::MessageBuffer;
