//! Registry of live subscriptions.

use crate::config::{Preferences, SubscriptionConfig};
use crate::error::{BufferError, Result};
use crate::types::{Destination, Message};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::subscription::Subscription;
use super::types::SubscriptionId;

/// Creates, tracks and disposes of subscriptions.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Arc<Subscription>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Applied to new subscriptions.
    config: RwLock<SubscriptionConfig>,
}

impl SubscriptionManager {
    /// Create a manager with the default configuration.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config: RwLock::new(SubscriptionConfig::default()),
        }
    }

    /// Create a manager with an explicit configuration.
    pub fn with_config(config: SubscriptionConfig) -> Result<Self> {
        config.validate()?;
        let manager = Self::new();
        *manager.config.write() = config;
        Ok(manager)
    }

    /// Create a manager configured from user preferences.
    pub fn from_preferences(prefs: &dyn Preferences) -> Self {
        let manager = Self::new();
        *manager.config.write() = SubscriptionConfig::from_preferences(prefs);
        manager
    }

    pub fn config(&self) -> SubscriptionConfig {
        self.config.read().clone()
    }

    /// Start buffering messages for `destination`.
    pub fn subscribe(&self, destination: Destination) -> Result<Arc<Subscription>> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let config = self.config();
        let subscription = Subscription::new(id, destination, &config)?;

        self.subscriptions.write().insert(id, Arc::clone(&subscription));
        tracing::info!(
            subscription = %id,
            destination = %subscription.destination(),
            capacity = config.max_buffered_messages,
            "subscribed"
        );

        Ok(subscription)
    }

    /// Unsubscribe and discard the subscription's buffer and observers.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let subscription = self
            .subscriptions
            .write()
            .remove(&id)
            .ok_or(BufferError::SubscriptionNotFound(id))?;

        subscription.close();
        tracing::info!(
            subscription = %id,
            destination = %subscription.destination(),
            "unsubscribed"
        );
        Ok(())
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.read().get(&id).cloned()
    }

    /// Live subscriptions on `destination`, oldest first.
    pub fn subscriptions_for(&self, destination: &Destination) -> Vec<Arc<Subscription>> {
        let mut matching: Vec<Arc<Subscription>> = self
            .subscriptions
            .read()
            .values()
            .filter(|s| s.destination() == destination)
            .cloned()
            .collect();
        matching.sort_by_key(|s| s.id());
        matching
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Route one delivered message to every subscription on `destination`.
    ///
    /// Returns the number of subscriptions that received it.
    pub fn deliver(&self, destination: &Destination, message: Message) -> usize {
        // Observers run during delivery, so the registry lock is not held.
        let targets = self.subscriptions_for(destination);
        for subscription in &targets {
            subscription.on_message_delivered(message.clone());
        }
        targets.len()
    }

    /// Change the capacity for new and existing subscriptions.
    pub fn set_max_buffered_messages(&self, max: usize) -> Result<()> {
        let config = SubscriptionConfig::with_max_buffered_messages(max)?;
        *self.config.write() = config;

        let subscriptions: Vec<Arc<Subscription>> =
            self.subscriptions.read().values().cloned().collect();
        for subscription in subscriptions {
            subscription.set_max_buffered_messages(max)?;
        }
        Ok(())
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
