//! Core value types shared by buffers and subscriptions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stable identity of a delivered message.
///
/// Two [`Message`] values with the same id denote the same message for
/// pinning, removal and containment checks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arrival position inside a single buffer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Sequence(pub u64);

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seq({})", self.0)
    }
}

impl Sequence {
    pub fn next(self) -> Self {
        Sequence(self.0 + 1)
    }
}

/// Hands out unique message ids.
///
/// The transport layer usually owns one of these per connection; it is not
/// process-global.
#[derive(Debug)]
pub struct MessageIdGenerator {
    next: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> MessageId {
        MessageId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// An opaque delivered message.
///
/// Payload and properties are shared, so cloning a message is cheap. Equality
/// and hashing only look at the id.
#[derive(Clone)]
pub struct Message {
    id: MessageId,
    payload: Arc<[u8]>,
    properties: Arc<Map<String, Value>>,
}

impl Message {
    /// Create a message with the given identity and payload.
    pub fn new(id: MessageId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: Arc::from(payload.into()),
            properties: Arc::new(Map::new()),
        }
    }

    /// Create a message with an empty payload.
    pub fn empty(id: MessageId) -> Self {
        Self::new(id, Vec::new())
    }

    /// Attach a header or property value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.properties).insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("payload_size", &self.payload.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Kind of broker destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    Queue,
    Topic,
}

/// A queue or topic as identified by the broker layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Destination {
    pub kind: DestinationKind,
    pub name: String,
}

impl Destination {
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::Queue,
            name: name.into(),
        }
    }

    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            kind: DestinationKind::Topic,
            name: name.into(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DestinationKind::Queue => write!(f, "queue://{}", self.name),
            DestinationKind::Topic => write!(f, "topic://{}", self.name),
        }
    }
}
