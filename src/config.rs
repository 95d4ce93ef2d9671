//! Subscription configuration and the user preference seam.
//!
//! Preference storage lives outside this crate; callers hand in anything that
//! implements [`Preferences`].

use crate::error::{BufferError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Preference key holding the per-subscription buffer capacity.
pub const PREF_MAX_BUFFERED_MSG: &str = "maxBufferedMessages";

/// Capacity used when nothing else is configured.
pub const DEFAULT_MAX_BUFFERED_MESSAGES: usize = 50;

/// Per-user preference lookup.
pub trait Preferences: Send + Sync {
    /// Get a preference value, or `default` when unset.
    fn user_pref(&self, key: &str, default: &str) -> String;

    /// Store a preference value.
    fn set_user_pref(&self, key: &str, value: &str);
}

/// Preferences kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for InMemoryPreferences {
    fn user_pref(&self, key: &str, default: &str) -> String {
        self.values
            .read()
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set_user_pref(&self, key: &str, value: &str) {
        self.values.write().insert(key.to_string(), value.to_string());
    }
}

/// Configuration applied to new subscriptions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Soft cap on buffered messages per subscription.
    /// Default: 50
    pub max_buffered_messages: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_buffered_messages: DEFAULT_MAX_BUFFERED_MESSAGES,
        }
    }
}

impl SubscriptionConfig {
    /// Config with an explicit capacity.
    pub fn with_max_buffered_messages(max_buffered_messages: usize) -> Result<Self> {
        let config = Self {
            max_buffered_messages,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the buffer cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_buffered_messages == 0 {
            return Err(BufferError::InvalidCapacity(self.max_buffered_messages));
        }
        Ok(())
    }

    /// Parse a JSON document such as `{"max_buffered_messages": 100}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the config from user preferences, falling back to the default
    /// for unusable values.
    pub fn from_preferences(prefs: &dyn Preferences) -> Self {
        match Self::from_preferences_strict(prefs) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{err}, using default of {DEFAULT_MAX_BUFFERED_MESSAGES}");
                Self::default()
            }
        }
    }

    /// Read the config from user preferences, failing on unusable values.
    pub fn from_preferences_strict(prefs: &dyn Preferences) -> Result<Self> {
        let default = DEFAULT_MAX_BUFFERED_MESSAGES.to_string();
        let raw = prefs.user_pref(PREF_MAX_BUFFERED_MSG, &default);
        let invalid = || BufferError::InvalidPreference {
            key: PREF_MAX_BUFFERED_MSG.to_string(),
            value: raw.clone(),
        };

        let max_buffered_messages: usize = raw.trim().parse().map_err(|_| invalid())?;
        if max_buffered_messages == 0 {
            return Err(invalid());
        }

        Ok(Self {
            max_buffered_messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        let prefs = InMemoryPreferences::new();
        let config = SubscriptionConfig::from_preferences(&prefs);
        assert_eq!(config.max_buffered_messages, 50);
    }

    #[test]
    fn test_capacity_from_preferences() {
        let prefs = InMemoryPreferences::new();
        prefs.set_user_pref(PREF_MAX_BUFFERED_MSG, "200");

        let config = SubscriptionConfig::from_preferences(&prefs);
        assert_eq!(config.max_buffered_messages, 200);
    }

    #[test]
    fn test_garbage_preference_falls_back() {
        let prefs = InMemoryPreferences::new();
        prefs.set_user_pref(PREF_MAX_BUFFERED_MSG, "lots");

        let config = SubscriptionConfig::from_preferences(&prefs);
        assert_eq!(config, SubscriptionConfig::default());

        let strict = SubscriptionConfig::from_preferences_strict(&prefs);
        assert!(matches!(strict, Err(BufferError::InvalidPreference { .. })));
    }

    #[test]
    fn test_zero_preference_rejected() {
        let prefs = InMemoryPreferences::new();
        prefs.set_user_pref(PREF_MAX_BUFFERED_MSG, "0");

        assert!(SubscriptionConfig::from_preferences_strict(&prefs).is_err());
        assert_eq!(SubscriptionConfig::from_preferences(&prefs).max_buffered_messages, 50);
    }

    #[test]
    fn test_from_json() {
        let config = SubscriptionConfig::from_json(r#"{"max_buffered_messages": 7}"#).unwrap();
        assert_eq!(config.max_buffered_messages, 7);

        let defaulted = SubscriptionConfig::from_json("{}").unwrap();
        assert_eq!(defaulted.max_buffered_messages, 50);

        assert!(matches!(
            SubscriptionConfig::from_json(r#"{"max_buffered_messages": 0}"#),
            Err(BufferError::InvalidCapacity(0))
        ));
        assert!(matches!(
            SubscriptionConfig::from_json("not json"),
            Err(BufferError::Config(_))
        ));
    }
}
