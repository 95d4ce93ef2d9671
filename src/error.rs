//! Error types for message buffers and subscriptions.

use crate::subscriptions::SubscriptionId;
use thiserror::Error;

/// Main error type for buffer and subscription operations.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Invalid capacity: {0} (must be at least 1)")]
    InvalidCapacity(usize),

    #[error("Invalid preference value for {key}: {value:?}")]
    InvalidPreference { key: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(SubscriptionId),

    #[error("Subscription is closed: {0}")]
    SubscriptionClosed(SubscriptionId),
}

impl From<serde_json::Error> for BufferError {
    fn from(e: serde_json::Error) -> Self {
        BufferError::Config(e.to_string())
    }
}

/// Result type for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;
