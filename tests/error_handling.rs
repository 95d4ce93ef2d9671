//! Error handling and edge case tests.

use livebuffer::{
    BufferError, Destination, InMemoryPreferences, Message, MessageBuffer, MessageId,
    Preferences, SubscriptionConfig, SubscriptionId, SubscriptionManager, PREF_MAX_BUFFERED_MSG,
};

// --- Capacity Errors ---

#[test]
fn test_zero_capacity_buffer() {
    let result = MessageBuffer::with_capacity(0);
    assert!(matches!(result, Err(BufferError::InvalidCapacity(0))));
}

#[test]
fn test_set_zero_capacity_keeps_old_value() {
    let buffer = MessageBuffer::with_capacity(4).unwrap();
    let result = buffer.set_capacity(0);

    assert!(matches!(result, Err(BufferError::InvalidCapacity(0))));
    assert_eq!(buffer.capacity(), 4);
}

#[test]
fn test_capacity_of_one() {
    let buffer = MessageBuffer::with_capacity(1).unwrap();
    for i in 0..5 {
        buffer.insert(Message::empty(MessageId(i)));
    }
    assert_eq!(buffer.snapshot(), vec![Message::empty(MessageId(4))]);
}

#[test]
fn test_subscription_rejects_zero_capacity() {
    let manager = SubscriptionManager::new();
    let subscription = manager.subscribe(Destination::queue("orders")).unwrap();

    assert!(subscription.set_max_buffered_messages(0).is_err());
    assert_eq!(subscription.max_buffered_messages(), 50);
}

#[test]
fn test_manager_rejects_invalid_config() {
    let config = SubscriptionConfig {
        max_buffered_messages: 0,
    };
    assert!(matches!(
        SubscriptionManager::with_config(config),
        Err(BufferError::InvalidCapacity(0))
    ));
}

// --- No-op Operations ---

#[test]
fn test_operations_on_empty_buffer() {
    let buffer = MessageBuffer::new();
    let absent = Message::empty(MessageId(1));

    // None of these should fail or change anything
    buffer.pin(&absent);
    buffer.unpin(&absent);
    buffer.unpin_all();
    assert_eq!(buffer.remove([&absent]), 0);
    assert_eq!(buffer.remove(std::iter::empty::<&Message>()), 0);

    assert!(buffer.is_empty());
    assert!(!buffer.contains(&absent));
    assert!(buffer.snapshot().is_empty());
}

#[test]
fn test_unpin_after_remove_is_noop() {
    let buffer = MessageBuffer::with_capacity(2).unwrap();
    let m = Message::empty(MessageId(1));
    buffer.insert(m.clone());
    buffer.pin(&m);
    buffer.remove([&m]);

    buffer.unpin(&m);
    assert_eq!(buffer.pinned_count(), 0);

    // Re-delivery creates a fresh, unpinned entry.
    buffer.insert(m.clone());
    assert!(!buffer.is_pinned(&m));
}

// --- Subscription Lifecycle ---

#[test]
fn test_unsubscribe_twice() {
    let manager = SubscriptionManager::new();
    let subscription = manager.subscribe(Destination::topic("prices")).unwrap();

    manager.unsubscribe(subscription.id()).unwrap();
    let result = manager.unsubscribe(subscription.id());
    assert!(matches!(result, Err(BufferError::SubscriptionNotFound(_))));
}

#[test]
fn test_delivery_after_unsubscribe_is_ignored() {
    let manager = SubscriptionManager::new();
    let destination = Destination::queue("orders");
    let subscription = manager.subscribe(destination.clone()).unwrap();
    manager.unsubscribe(subscription.id()).unwrap();

    // Transport still holds a reference and keeps delivering.
    subscription.on_message_delivered(Message::empty(MessageId(1)));
    assert_eq!(subscription.message_count(), 0);
    assert_eq!(manager.deliver(&destination, Message::empty(MessageId(2))), 0);
}

#[test]
fn test_error_messages() {
    assert_eq!(
        BufferError::InvalidCapacity(0).to_string(),
        "Invalid capacity: 0 (must be at least 1)"
    );
    assert_eq!(
        BufferError::SubscriptionNotFound(SubscriptionId(3)).to_string(),
        "Subscription not found: 3"
    );
}

// --- Preferences ---

#[test]
fn test_negative_preference_falls_back() {
    let prefs = InMemoryPreferences::new();
    prefs.set_user_pref(PREF_MAX_BUFFERED_MSG, "-5");

    let manager = SubscriptionManager::from_preferences(&prefs);
    assert_eq!(manager.config().max_buffered_messages, 50);

    let strict = SubscriptionConfig::from_preferences_strict(&prefs);
    match strict {
        Err(BufferError::InvalidPreference { key, value }) => {
            assert_eq!(key, PREF_MAX_BUFFERED_MSG);
            assert_eq!(value, "-5");
        }
        other => panic!("Expected InvalidPreference, got {:?}", other),
    }
}

#[test]
fn test_preference_whitespace_tolerated() {
    let prefs = InMemoryPreferences::new();
    prefs.set_user_pref(PREF_MAX_BUFFERED_MSG, " 25 ");

    let config = SubscriptionConfig::from_preferences_strict(&prefs).unwrap();
    assert_eq!(config.max_buffered_messages, 25);
}
