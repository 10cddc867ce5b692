//! Configuration options for document persistence.
//!
//! This module provides the [`PersistenceConfig`] struct which controls how the
//! [`DocumentMapper`](crate::DocumentMapper) assigns identities and retries
//! conflicting inserts.

use crate::error::{IsisError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for saving records.
///
/// # Examples
///
/// ```
/// use isisdm::PersistenceConfig;
///
/// // Defaults: 10 attempts, 500 ms apart, 5-character identities
/// let config = PersistenceConfig::default();
/// assert_eq!(config.max_attempts, 10);
///
/// // Custom configuration
/// let config = PersistenceConfig::default()
///     .with_max_attempts(3)
///     .with_retry_delay_ms(0);
///
/// // Or loaded from JSON, missing keys taking their defaults
/// let config = PersistenceConfig::from_json(r#"{"identity_length": 8}"#).unwrap();
/// assert_eq!(config.identity_length, 8);
/// assert_eq!(config.retry_delay_ms, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Insert attempts, each with a fresh identity, before giving up.
    pub max_attempts: u32,

    /// Pause between conflicting insert attempts, in milliseconds.
    pub retry_delay_ms: u64,

    /// Length of generated document identities.
    pub identity_length: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            max_attempts: 10,
            retry_delay_ms: 500,
            identity_length: 5,
        }
    }
}

impl PersistenceConfig {
    /// Set the number of insert attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the pause between insert attempts.
    #[must_use]
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Set the length of generated identities.
    #[must_use]
    pub fn with_identity_length(mut self, identity_length: usize) -> Self {
        self.identity_length = identity_length;
        self
    }

    /// Pause between insert attempts.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::InvalidInput`] for malformed JSON or values that
    /// fail [`PersistenceConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PersistenceConfig =
            serde_json::from_str(json).map_err(|e| IsisError::InvalidInput(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that at least one attempt is allowed and identities are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`IsisError::InvalidInput`] describing the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(IsisError::InvalidInput(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.identity_length == 0 {
            return Err(IsisError::InvalidInput(
                "identity_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PersistenceConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.retry_delay(), Duration::from_millis(500));
        assert_eq!(config.identity_length, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = PersistenceConfig::default()
            .with_max_attempts(2)
            .with_retry_delay_ms(0)
            .with_identity_length(7);
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.retry_delay(), Duration::ZERO);
        assert_eq!(config.identity_length, 7);
    }

    #[test]
    fn test_from_json() {
        let config = PersistenceConfig::from_json(r#"{"max_attempts": 3}"#).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.identity_length, 5);

        assert!(PersistenceConfig::from_json("{not json").is_err());
        assert!(PersistenceConfig::from_json(r#"{"max_attempts": 0}"#).is_err());
        assert!(PersistenceConfig::from_json(r#"{"identity_length": 0}"#).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PersistenceConfig::default().with_max_attempts(4);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PersistenceConfig::from_json(&json).unwrap(), config);
    }
}
